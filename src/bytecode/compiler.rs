//! Bytecode compiler: type-directed lowering from AST to bytecode.
//!
//! Primitive values travel through the Left register; identifiers load a
//! pointer first and are dereferenced where a value is needed. The static
//! type returned by each expression carries a `ref` flag telling the caller
//! which of the two it got.

use std::collections::HashMap;

use crate::ast::{BinaryOp, Initializer, Node, NodeKind, Program, TypeExpr, UnaryOp};
use crate::bytecode::emitter::Emitter;
use crate::bytecode::opcode::{pack_reg, OpCode, REG_LEFT};
use crate::bytecode::vm::FRAME_HEADER_SIZE;
use crate::error::CompileError;
use crate::span::Span;
use crate::types::{
    self, category, is_primitive, primitive_byte, promote, type_size, width, CAT_FLOAT,
};

pub type CompileResult<T> = Result<T, CompileError>;

/// The compiled artifact: the full byte vector (instructions, RETURN,
/// constant pool) plus the length of the instruction region.
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    pub bytes: Vec<u8>,
    /// Offset of the constant-pool region; the byte before it is RETURN.
    pub code_size: usize,
}

/// Everything recorded about a declared variable.
#[derive(Debug, Clone)]
struct VarInfo {
    is_global: bool,
    is_prim: bool,
    prim: u8,
    offset: i32,
    size: u32,
    ty: TypeExpr,
}

/// Lowering state for one expression block: the declared result type and
/// the positions of exit-jump operands awaiting the end-of-block patch.
struct ExprBlockFrame {
    ty: TypeExpr,
    prim: u8,
    exits: Vec<usize>,
    /// Emitter stack cursor at block entry; yields release down to here.
    stack_mark: i32,
}

/// The bytecode compiler.
pub struct Compiler {
    emitter: Emitter,
    variables: HashMap<String, VarInfo>,
    /// Top-level declaration order, for reverse teardown.
    globals: Vec<String>,
    /// One name list per open local scope.
    scopes: Vec<Vec<String>>,
    expr_blocks: Vec<ExprBlockFrame>,
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            emitter: Emitter::new(FRAME_HEADER_SIZE as i32),
            variables: HashMap::new(),
            globals: Vec::new(),
            scopes: Vec::new(),
            expr_blocks: Vec::new(),
        }
    }

    /// Compile a program into its final byte stream.
    pub fn compile(mut self, program: &Program) -> CompileResult<CompiledProgram> {
        for stmt in &program.statements {
            self.compile_statement(stmt)?;
        }

        // Tear down globals in reverse declaration order. Pops land in
        // Left, so the first-declared global's value is the one observable
        // there after the run.
        while let Some(name) = self.globals.pop() {
            let info = self
                .variables
                .remove(&name)
                .expect("global was registered at declaration");
            self.emit_teardown(&info);
        }

        let (bytes, code_size) = self.emitter.finish();
        Ok(CompiledProgram { bytes, code_size })
    }

    fn emit_teardown(&mut self, info: &VarInfo) {
        if info.ty.is_ref {
            self.emitter.emit_pop_left(8);
        } else if info.is_prim {
            self.emitter.emit_pop_left(width(info.prim));
        } else {
            self.emitter.emit_release(info.size as i16);
        }
    }

    // ===== Statements =====

    fn compile_statement(&mut self, node: &Node) -> CompileResult<()> {
        match &node.kind {
            NodeKind::VarDecl { ty, name, init } => {
                self.compile_var_decl(ty, name, init.as_ref(), node.span)
            }
            NodeKind::CodeBlock(statements) => self.compile_code_block(statements),
            NodeKind::IfElse {
                cond,
                then_branch,
                else_branch,
            } => self.compile_if_else(cond, then_branch, else_branch.as_deref()),
            NodeKind::Yield(expr) => self.compile_yield(expr, node.span),
            NodeKind::DoExpr(expr) => {
                // Result discarded; only side effects survive.
                self.compile_expression(expr)?;
                Ok(())
            }
            NodeKind::Number(_)
            | NodeKind::Identifier(_)
            | NodeKind::Unary { .. }
            | NodeKind::Binary { .. }
            | NodeKind::ExprBlock { .. } => {
                self.compile_expression(node)?;
                Ok(())
            }
        }
    }

    fn compile_var_decl(
        &mut self,
        declared: &TypeExpr,
        name: &str,
        init: Option<&Initializer>,
        span: Span,
    ) -> CompileResult<()> {
        if self.variables.contains_key(name) {
            return Err(CompileError::Redeclaration(name.to_string(), span));
        }

        let is_global = self.scopes.is_empty();

        let offset = if declared.is_ref {
            self.compile_ref_init(declared, init, span)?
        } else if is_primitive(declared) {
            self.compile_prim_init(declared, init, span)?
        } else {
            return Err(CompileError::unsupported("Aggregate declarations", span));
        };

        let info = VarInfo {
            is_global,
            is_prim: !declared.is_ref && is_primitive(declared),
            prim: primitive_byte(declared),
            offset,
            size: type_size(declared),
            ty: declared.clone(),
        };
        self.variables.insert(name.to_string(), info);

        if is_global {
            self.globals.push(name.to_string());
        } else if let Some(scope) = self.scopes.last_mut() {
            scope.push(name.to_string());
        }

        Ok(())
    }

    /// Reference declaration: the initializer is mandatory, must match the
    /// declared type structurally, and must itself be a reference. The
    /// pointer is pushed at pointer width.
    fn compile_ref_init(
        &mut self,
        declared: &TypeExpr,
        init: Option<&Initializer>,
        span: Span,
    ) -> CompileResult<i32> {
        let Some(init) = init else {
            return Err(CompileError::MissingReferenceInit(span));
        };
        let Initializer::Expr(expr) = init else {
            return Err(CompileError::unsupported("Constructor lists", span));
        };

        let it = self.compile_expression(expr)?;
        if it != *declared || !it.is_ref {
            return Err(CompileError::ReferenceInitMismatch {
                expected: declared.name.clone(),
                found: it.to_string(),
                span,
            });
        }

        Ok(self.emitter.emit_push(pack_reg(REG_LEFT, 8)))
    }

    /// Primitive declaration: lower the initializer (or synthesize zero),
    /// convert to the declared width, push.
    fn compile_prim_init(
        &mut self,
        declared: &TypeExpr,
        init: Option<&Initializer>,
        span: Span,
    ) -> CompileResult<i32> {
        let prim = primitive_byte(declared);

        match init {
            Some(Initializer::Expr(expr)) => {
                let mut it = self.compile_expression(expr)?;
                if !is_primitive(&it) {
                    return Err(CompileError::mismatch(
                        declared.to_string(),
                        it.to_string(),
                        span,
                    ));
                }
                let ip = primitive_byte(&it);
                self.deref_primitive(&mut it);
                self.emitter.emit_conv(ip, prim);
            }
            Some(Initializer::Constructor(_)) => {
                return Err(CompileError::unsupported("Constructor lists", span));
            }
            None => {
                let zero = if category(prim) == CAT_FLOAT {
                    if width(prim) == 4 {
                        "0f"
                    } else {
                        "0d"
                    }
                } else {
                    "0"
                };
                let zt = self.compile_number(zero, span)?;
                self.emitter.emit_conv(primitive_byte(&zt), prim);
            }
        }

        Ok(self.emitter.emit_push(pack_reg(REG_LEFT, width(prim))))
    }

    fn compile_code_block(&mut self, statements: &[Node]) -> CompileResult<()> {
        self.scopes.push(Vec::new());

        for stmt in statements {
            self.compile_statement(stmt)?;
        }

        let names = self.scopes.pop().expect("scope stack balanced");
        for name in names.iter().rev() {
            let info = self
                .variables
                .remove(name)
                .expect("scoped variable was registered");
            self.emit_teardown(&info);
        }

        Ok(())
    }

    fn compile_if_else(
        &mut self,
        cond: &Node,
        then_branch: &Node,
        else_branch: Option<&Node>,
    ) -> CompileResult<()> {
        let mut ct = self.compile_expression(cond)?;
        if !is_primitive(&ct) {
            return Err(CompileError::mismatch(
                "primitive condition",
                ct.to_string(),
                cond.span,
            ));
        }
        let cp = primitive_byte(&ct);
        self.deref_primitive(&mut ct);
        // JMPZ tests the low byte only
        self.emitter.emit_conv(cp, types::U8);

        self.emitter.op(OpCode::Jmpz);
        let skip_then = self.emitter.placeholder_i32();

        self.compile_statement(then_branch)?;

        if let Some(else_branch) = else_branch {
            self.emitter.op(OpCode::Jmp);
            let skip_else = self.emitter.placeholder_i32();

            let else_start = self.emitter.position() as i32;
            self.emitter.patch_i32(skip_then, else_start);

            self.compile_statement(else_branch)?;

            let end = self.emitter.position() as i32;
            self.emitter.patch_i32(skip_else, end);
        } else {
            let end = self.emitter.position() as i32;
            self.emitter.patch_i32(skip_then, end);
        }

        Ok(())
    }

    /// Yield: convert the value to the block type, release what this block
    /// scope allocated on this path, and jump to the block's exit.
    fn compile_yield(&mut self, expr: &Node, span: Span) -> CompileResult<()> {
        let Some(frame) = self.expr_blocks.last() else {
            return Err(CompileError::YieldOutsideBlock(span));
        };
        let block_ty = frame.ty.clone();
        let block_prim = frame.prim;
        let stack_mark = frame.stack_mark;

        let mut yt = self.compile_expression(expr)?;
        if !is_primitive(&yt) {
            return Err(CompileError::YieldTypeMismatch {
                expected: block_ty.to_string(),
                found: yt.to_string(),
                span,
            });
        }
        let yp = primitive_byte(&yt);
        self.deref_primitive(&mut yt);
        self.emitter.emit_conv(yp, block_prim);

        let delta = self.emitter.stack_top() - stack_mark;
        if delta > 0 {
            self.emitter.emit_release_untracked(delta as i16);
        }

        self.emitter.op(OpCode::Jmp);
        let at = self.emitter.placeholder_i32();
        if let Some(frame) = self.expr_blocks.last_mut() {
            frame.exits.push(at);
        }

        Ok(())
    }

    // ===== Expressions =====

    /// Lower an expression; the result lands in the Left register. The
    /// returned type's `ref` flag says whether Left holds a pointer.
    fn compile_expression(&mut self, node: &Node) -> CompileResult<TypeExpr> {
        match &node.kind {
            NodeKind::Number(lexeme) => self.compile_number(lexeme, node.span),
            NodeKind::Identifier(name) => self.compile_identifier(name, node.span),
            NodeKind::Unary { op, operand } => self.compile_unary(*op, operand, node.span),
            NodeKind::Binary { op, left, right } => {
                self.compile_binary(*op, left, right, node.span)
            }
            NodeKind::ExprBlock { ty, statements } => {
                self.compile_expr_block(ty, statements, node.span)
            }
            NodeKind::VarDecl { .. }
            | NodeKind::CodeBlock(_)
            | NodeKind::IfElse { .. }
            | NodeKind::DoExpr(_)
            | NodeKind::Yield(_) => Err(CompileError::General {
                message: "Statement in expression position".to_string(),
                span: node.span,
            }),
        }
    }

    /// Number literal: `.` or `f` means f32, `d` means f64, otherwise the
    /// smallest unsigned integer that fits. Constants are locked.
    fn compile_number(&mut self, lexeme: &str, span: Span) -> CompileResult<TypeExpr> {
        let invalid = || CompileError::InvalidNumber(lexeme.to_string(), span);

        if lexeme.contains('.') || lexeme.contains('f') {
            let value: f32 = lexeme
                .trim_end_matches(['f', 'd'])
                .parse()
                .map_err(|_| invalid())?;
            self.emitter.emit_load_constant(&value.to_le_bytes());
            return Ok(TypeExpr::literal("f32"));
        }

        if lexeme.contains('d') {
            let value: f64 = lexeme.trim_end_matches('d').parse().map_err(|_| invalid())?;
            self.emitter.emit_load_constant(&value.to_le_bytes());
            return Ok(TypeExpr::literal("f64"));
        }

        let value: u64 = lexeme.parse().map_err(|_| invalid())?;

        if value < 1 << 8 {
            self.emitter.emit_load_constant(&(value as u8).to_le_bytes());
            Ok(TypeExpr::literal("u8"))
        } else if value < 1 << 16 {
            self.emitter.emit_load_constant(&(value as u16).to_le_bytes());
            Ok(TypeExpr::literal("u16"))
        } else if value < 1 << 32 {
            self.emitter.emit_load_constant(&(value as u32).to_le_bytes());
            Ok(TypeExpr::literal("u32"))
        } else {
            self.emitter.emit_load_constant(&value.to_le_bytes());
            Ok(TypeExpr::literal("u64"))
        }
    }

    /// Identifier: load a pointer to the variable's storage. For a variable
    /// that is itself a reference, dereference the slot immediately so Left
    /// holds the target pointer.
    fn compile_identifier(&mut self, name: &str, span: Span) -> CompileResult<TypeExpr> {
        let Some(info) = self.variables.get(name) else {
            return Err(CompileError::UnknownVariable(name.to_string(), span));
        };
        let is_global = info.is_global;
        let offset = info.offset;
        let mut ty = info.ty.clone();

        self.emitter.op(if is_global { OpCode::Spp } else { OpCode::Fpp });
        self.emitter.i32(offset);

        if ty.is_ref {
            // The slot stores a pointer; chase it once.
            self.emitter.op(OpCode::Load);
            self.emitter.byte(8);
        }

        ty.is_ref = true;
        Ok(ty)
    }

    /// If the type is a reference, load the pointed-at value into Left.
    fn deref_primitive(&mut self, ty: &mut TypeExpr) {
        if !ty.is_ref {
            return;
        }
        let prim = primitive_byte(ty);
        self.emitter.op(OpCode::Load);
        self.emitter.byte(width(prim));
        ty.is_ref = false;
    }

    fn compile_unary(
        &mut self,
        op: UnaryOp,
        operand: &Node,
        span: Span,
    ) -> CompileResult<TypeExpr> {
        let mut ty = self.compile_expression(operand)?;
        if !is_primitive(&ty) {
            return Err(CompileError::mismatch(
                "primitive operand",
                ty.to_string(),
                span,
            ));
        }
        let prim = primitive_byte(&ty);
        self.deref_primitive(&mut ty);

        match op {
            UnaryOp::Neg => {
                self.emitter.op(OpCode::Neg);
                self.emitter.byte(prim);
                ty.locked = true;
                Ok(ty)
            }
            UnaryOp::BitNot => {
                self.emitter.op(OpCode::Not);
                self.emitter.byte(prim);
                ty.locked = true;
                Ok(ty)
            }
            UnaryOp::Not => {
                self.emitter.emit_conv(prim, types::U8);
                self.emitter.op(OpCode::BNot);
                Ok(TypeExpr::literal("u8"))
            }
        }
    }

    fn compile_binary(
        &mut self,
        op: BinaryOp,
        left: &Node,
        right: &Node,
        span: Span,
    ) -> CompileResult<TypeExpr> {
        if op.is_assignment() {
            return self.compile_assignment(op, left, right);
        }
        match op {
            BinaryOp::Comma => {
                return Err(CompileError::unsupported("The ',' operator", span));
            }
            BinaryOp::Member => {
                return Err(CompileError::unsupported("Member access", span));
            }
            _ => {}
        }

        // Left operand: lower, dereference, park on the stack as a value.
        let mut lt = self.compile_expression(left)?;
        if !is_primitive(&lt) {
            return Err(CompileError::mismatch(
                "primitive operand",
                lt.to_string(),
                left.span,
            ));
        }
        let lp = primitive_byte(&lt);
        self.deref_primitive(&mut lt);
        self.emitter.emit_push(pack_reg(REG_LEFT, width(lp)));

        // Right operand straight into Left, then promote.
        let mut rt = self.compile_expression(right)?;
        let best = promote(&lt, &rt).ok_or_else(|| CompileError::NonPrimitiveMismatch {
            left: lt.to_string(),
            right: rt.to_string(),
            span,
        })?;
        let bp = primitive_byte(&best);
        let rp = primitive_byte(&rt);
        self.deref_primitive(&mut rt);

        // Boolean operators work over u8; everything else over the promoted
        // type.
        let target = match op {
            BinaryOp::And | BinaryOp::Or => types::U8,
            _ => bp,
        };

        self.emitter.emit_conv(rp, target);
        self.emitter.op(OpCode::Swap);
        self.emitter.emit_pop(pack_reg(REG_LEFT, width(lp)));
        self.emitter.emit_conv(lp, target);

        let typed = |e: &mut Emitter, opcode: OpCode| {
            e.op(opcode);
            e.byte(bp);
        };

        match op {
            BinaryOp::Add => typed(&mut self.emitter, OpCode::Add),
            BinaryOp::Sub => typed(&mut self.emitter, OpCode::Sub),
            BinaryOp::Mul => typed(&mut self.emitter, OpCode::Mul),
            BinaryOp::Div => typed(&mut self.emitter, OpCode::Div),
            BinaryOp::BitAnd => typed(&mut self.emitter, OpCode::And),
            BinaryOp::BitOr => typed(&mut self.emitter, OpCode::Or),
            BinaryOp::BitXor => typed(&mut self.emitter, OpCode::Xor),
            BinaryOp::Equal => typed(&mut self.emitter, OpCode::CmpE),
            BinaryOp::Less => typed(&mut self.emitter, OpCode::CmpL),
            BinaryOp::Greater => typed(&mut self.emitter, OpCode::CmpG),
            BinaryOp::NotEqual => {
                typed(&mut self.emitter, OpCode::CmpE);
                self.emitter.op(OpCode::BNot);
            }
            BinaryOp::GreaterEqual => {
                typed(&mut self.emitter, OpCode::CmpL);
                self.emitter.op(OpCode::BNot);
            }
            BinaryOp::LessEqual => {
                typed(&mut self.emitter, OpCode::CmpG);
                self.emitter.op(OpCode::BNot);
            }
            BinaryOp::And => self.emitter.op(OpCode::BAnd),
            BinaryOp::Or => self.emitter.op(OpCode::BOr),
            BinaryOp::Comma
            | BinaryOp::Member
            | BinaryOp::Assign
            | BinaryOp::AddAssign
            | BinaryOp::SubAssign
            | BinaryOp::MulAssign
            | BinaryOp::DivAssign => unreachable!("handled above"),
        }

        match op {
            BinaryOp::Equal
            | BinaryOp::NotEqual
            | BinaryOp::Less
            | BinaryOp::Greater
            | BinaryOp::LessEqual
            | BinaryOp::GreaterEqual
            | BinaryOp::And
            | BinaryOp::Or => Ok(TypeExpr::literal("u8")),
            _ => {
                let mut result = best;
                result.locked = true;
                Ok(result)
            }
        }
    }

    /// Assignment family: the left operand must lower to an unlocked
    /// primitive reference. Compound forms load the current value, apply
    /// the arithmetic, and store back through the saved pointer.
    fn compile_assignment(
        &mut self,
        op: BinaryOp,
        left: &Node,
        right: &Node,
    ) -> CompileResult<TypeExpr> {
        let lt = self.compile_expression(left)?;
        if !lt.is_ref {
            return Err(CompileError::AssignToValue(left.span));
        }
        if lt.locked {
            return Err(CompileError::AssignToLocked(left.span));
        }
        if !is_primitive(&lt) {
            return Err(CompileError::unsupported(
                "Assignment to aggregate values",
                left.span,
            ));
        }
        let lp = primitive_byte(&lt);
        let size = width(lp);

        // Park the target pointer while the right side runs.
        self.emitter.emit_push(pack_reg(REG_LEFT, 8));

        let mut rt = self.compile_expression(right)?;
        if !is_primitive(&rt) {
            return Err(CompileError::mismatch(
                lt.to_string(),
                rt.to_string(),
                right.span,
            ));
        }
        let rp = primitive_byte(&rt);
        self.deref_primitive(&mut rt);
        self.emitter.emit_conv(rp, lp);

        self.emitter.op(OpCode::Swap); // value -> Right
        self.emitter.emit_pop(pack_reg(REG_LEFT, 8)); // pointer -> Left

        if op == BinaryOp::Assign {
            self.emitter.op(OpCode::Store);
            self.emitter.byte(size);
        } else {
            let arith = match op {
                BinaryOp::AddAssign => OpCode::Add,
                BinaryOp::SubAssign => OpCode::Sub,
                BinaryOp::MulAssign => OpCode::Mul,
                BinaryOp::DivAssign => OpCode::Div,
                _ => unreachable!("not a compound assignment"),
            };
            self.emitter.emit_push(pack_reg(REG_LEFT, 8)); // keep the pointer
            self.emitter.op(OpCode::Load);
            self.emitter.byte(size); // Left <- current value
            self.emitter.op(arith);
            self.emitter.byte(lp); // Left <- current op value
            self.emitter.op(OpCode::Swap); // result -> Right
            self.emitter.emit_pop(pack_reg(REG_LEFT, 8)); // pointer -> Left
            self.emitter.op(OpCode::Store);
            self.emitter.byte(size);
        }

        // Still a reference to the (now updated) left value.
        Ok(lt)
    }

    /// Expression block: a typed block whose yields converge on a common
    /// exit with the value in Left.
    fn compile_expr_block(
        &mut self,
        ty: &TypeExpr,
        statements: &[Node],
        span: Span,
    ) -> CompileResult<TypeExpr> {
        if !is_primitive(ty) {
            return Err(CompileError::mismatch(
                "primitive block type",
                ty.to_string(),
                span,
            ));
        }

        self.expr_blocks.push(ExprBlockFrame {
            ty: ty.clone(),
            prim: primitive_byte(ty),
            exits: Vec::new(),
            stack_mark: self.emitter.stack_top(),
        });
        self.scopes.push(Vec::new());

        for stmt in statements {
            self.compile_statement(stmt)?;
        }

        // Fall-through teardown mirrors the per-yield releases: one RELEASE
        // of everything this scope allocated.
        let names = self.scopes.pop().expect("scope stack balanced");
        for name in &names {
            self.variables.remove(name);
        }
        let frame = self.expr_blocks.pop().expect("expression block open");
        let delta = self.emitter.stack_top() - frame.stack_mark;
        if delta > 0 {
            self.emitter.emit_release(delta as i16);
        }

        let end = self.emitter.position() as i32;
        for at in frame.exits {
            self.emitter.patch_i32(at, end);
        }

        let mut result = frame.ty;
        result.locked = true;
        result.is_ref = false;
        Ok(result)
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}
