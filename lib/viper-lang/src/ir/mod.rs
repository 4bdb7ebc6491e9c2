//! The linear intermediate representation
//!
//! One [`IrModule`] is produced per compilation. Functions own a control
//! flow graph of basic blocks; instructions are values held in a module-wide
//! arena so operands are plain ids. The module serializes to a textual form
//! on stdout and to a relocatable object file.

mod builder;
mod object;

pub use builder::IrBuilder;
pub use object::write_object;

use std::fmt;

use crate::context::{Arena, NodeId};

pub type FuncId = NodeId<IrFunction>;
pub type BlockId = NodeId<BasicBlock>;
pub type ValueId = NodeId<IrValue>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrType {
    Void,
    Bool,
    Int(u32),
    Ptr(Box<IrType>),
    Array(Box<IrType>, u64),
    Struct(Vec<IrType>),
    Function {
        ret: Box<IrType>,
        params: Vec<IrType>,
    },
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Void => write!(f, "void"),
            IrType::Bool => write!(f, "i1"),
            IrType::Int(bits) => write!(f, "i{bits}"),
            IrType::Ptr(inner) => write!(f, "{inner}*"),
            IrType::Array(inner, count) => write!(f, "[{count} x {inner}]"),
            IrType::Struct(fields) => {
                write!(f, "{{ ")?;
                for (idx, field) in fields.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{field}")?;
                }
                write!(f, " }}")
            }
            IrType::Function { ret, params } => {
                write!(f, "(")?;
                for (idx, param) in params.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ") -> {ret}")
            }
        }
    }
}

#[derive(Debug)]
pub struct IrFunction {
    pub name: String,
    pub ret: IrType,
    pub params: Vec<IrType>,
    pub pure: bool,
    /// The value observed by callers through the argument accessor.
    pub args: Vec<ValueId>,
    pub blocks: Vec<BlockId>,
    /// The function as a callable value.
    pub value: ValueId,
}

impl IrFunction {
    /// A function with no blocks is a declaration (external linkage).
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[derive(Debug)]
pub struct BasicBlock {
    pub function: FuncId,
    pub insts: Vec<ValueId>,
    pub predecessors: Vec<BlockId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpPred {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl fmt::Display for CmpPred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmpPred::Eq => "eq",
            CmpPred::Ne => "ne",
            CmpPred::Lt => "lt",
            CmpPred::Gt => "gt",
            CmpPred::Le => "le",
            CmpPred::Ge => "ge",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug)]
pub enum InstKind {
    Alloca { allocated: IrType },
    Load { ptr: ValueId },
    Store { ptr: ValueId, value: ValueId },
    StructGep { ptr: ValueId, index: usize },
    PtrCast { value: ValueId },
    IntCast { value: ValueId },
    AddrOf { value: ValueId },
    Call { callee: ValueId, args: Vec<ValueId> },
    Ret { value: Option<ValueId> },
    Add { lhs: ValueId, rhs: ValueId },
    Sub { lhs: ValueId, rhs: ValueId },
    Mul { lhs: ValueId, rhs: ValueId },
    Div { lhs: ValueId, rhs: ValueId },
    Cmp { pred: CmpPred, lhs: ValueId, rhs: ValueId },
    Br { dest: BlockId },
    CondBr { cond: ValueId, then_dest: BlockId, else_dest: BlockId },
}

#[derive(Debug)]
pub enum IrValueKind {
    Function(FuncId),
    Argument { function: FuncId, index: usize },
    ConstInt(i64),
    ConstStr(String),
    Inst { block: BlockId, kind: InstKind },
}

#[derive(Debug)]
pub struct IrValue {
    pub ty: IrType,
    pub kind: IrValueKind,
}

#[derive(Debug, Default)]
pub struct IrModule {
    pub name: String,
    pub functions: Arena<IrFunction>,
    pub blocks: Arena<BasicBlock>,
    pub values: Arena<IrValue>,
}

impl IrModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn value(&self, id: ValueId) -> &IrValue {
        self.values.get(id)
    }

    pub fn function(&self, id: FuncId) -> &IrFunction {
        self.functions.get(id)
    }

    /// Argument accessor of a function, by index.
    pub fn argument(&self, func: FuncId, index: usize) -> ValueId {
        self.functions.get(func).args[index]
    }

    /// The pointer operand of a load, if `value` is one.
    pub fn pointer_operand(&self, value: ValueId) -> Option<ValueId> {
        match &self.values.get(value).kind {
            IrValueKind::Inst {
                kind: InstKind::Load { ptr },
                ..
            } => Some(*ptr),
            _ => None,
        }
    }

    pub fn is_gep(&self, value: ValueId) -> bool {
        matches!(
            &self.values.get(value).kind,
            IrValueKind::Inst {
                kind: InstKind::StructGep { .. },
                ..
            }
        )
    }

    pub fn is_alloca(&self, value: ValueId) -> bool {
        matches!(
            &self.values.get(value).kind,
            IrValueKind::Inst {
                kind: InstKind::Alloca { .. },
                ..
            }
        )
    }
}

// ---------------------------------------------------------------------------
// Textual serialization
// ---------------------------------------------------------------------------

struct FunctionPrinter<'m> {
    module: &'m IrModule,
    numbers: std::collections::HashMap<ValueId, usize>,
    block_numbers: std::collections::HashMap<BlockId, usize>,
}

impl<'m> FunctionPrinter<'m> {
    fn new(module: &'m IrModule, func: &IrFunction) -> Self {
        let mut numbers = std::collections::HashMap::new();
        let mut block_numbers = std::collections::HashMap::new();
        let mut next = 0usize;

        for &arg in &func.args {
            numbers.insert(arg, next);
            next += 1;
        }
        for (block_idx, &block_id) in func.blocks.iter().enumerate() {
            block_numbers.insert(block_id, block_idx);
            for &inst in &module.blocks.get(block_id).insts {
                if module.value(inst).ty != IrType::Void {
                    numbers.insert(inst, next);
                    next += 1;
                }
            }
        }

        Self {
            module,
            numbers,
            block_numbers,
        }
    }

    fn operand(&self, value: ValueId) -> String {
        let v = self.module.value(value);
        match &v.kind {
            IrValueKind::Function(func) => {
                format!("{} @{}", v.ty, self.module.function(*func).name)
            }
            IrValueKind::ConstInt(i) => format!("{} {}", v.ty, i),
            IrValueKind::ConstStr(s) => format!("{} \"{}\"", v.ty, s.escape_default()),
            _ => match self.numbers.get(&value) {
                Some(n) => format!("{} %{}", v.ty, n),
                None => format!("{} %?", v.ty),
            },
        }
    }

    fn label(&self, block: BlockId) -> String {
        format!("label{}", self.block_numbers.get(&block).copied().unwrap_or(0))
    }

    fn print_inst(&self, f: &mut fmt::Formatter<'_>, inst_id: ValueId) -> fmt::Result {
        let value = self.module.value(inst_id);
        let IrValueKind::Inst { kind, .. } = &value.kind else {
            return Ok(());
        };

        write!(f, "  ")?;
        if value.ty != IrType::Void {
            if let Some(n) = self.numbers.get(&inst_id) {
                write!(f, "%{} = ", n)?;
            }
        }

        match kind {
            InstKind::Alloca { allocated } => writeln!(f, "alloca {allocated}"),
            InstKind::Load { ptr } => writeln!(f, "load {}", self.operand(*ptr)),
            InstKind::Store { ptr, value } => {
                writeln!(f, "store {}, {}", self.operand(*value), self.operand(*ptr))
            }
            InstKind::StructGep { ptr, index } => {
                writeln!(f, "gep {}, {}", self.operand(*ptr), index)
            }
            InstKind::PtrCast { value: v } => {
                writeln!(f, "ptrcast {} to {}", self.operand(*v), value.ty)
            }
            InstKind::IntCast { value: v } => {
                writeln!(f, "intcast {} to {}", self.operand(*v), value.ty)
            }
            InstKind::AddrOf { value: v } => writeln!(f, "addrof {}", self.operand(*v)),
            InstKind::Call { callee, args } => {
                let callee_str = match &self.module.value(*callee).kind {
                    IrValueKind::Function(func) => {
                        format!("@{}", self.module.function(*func).name)
                    }
                    _ => self.operand(*callee),
                };
                let args = args
                    .iter()
                    .map(|&a| self.operand(a))
                    .collect::<Vec<_>>()
                    .join(", ");
                writeln!(f, "call {callee_str}({args})")
            }
            InstKind::Ret { value: Some(v) } => writeln!(f, "ret {}", self.operand(*v)),
            InstKind::Ret { value: None } => writeln!(f, "ret void"),
            InstKind::Add { lhs, rhs } => {
                writeln!(f, "add {}, {}", self.operand(*lhs), self.operand(*rhs))
            }
            InstKind::Sub { lhs, rhs } => {
                writeln!(f, "sub {}, {}", self.operand(*lhs), self.operand(*rhs))
            }
            InstKind::Mul { lhs, rhs } => {
                writeln!(f, "mul {}, {}", self.operand(*lhs), self.operand(*rhs))
            }
            InstKind::Div { lhs, rhs } => {
                writeln!(f, "div {}, {}", self.operand(*lhs), self.operand(*rhs))
            }
            InstKind::Cmp { pred, lhs, rhs } => writeln!(
                f,
                "cmp {pred} {}, {}",
                self.operand(*lhs),
                self.operand(*rhs)
            ),
            InstKind::Br { dest } => writeln!(f, "br {}", self.label(*dest)),
            InstKind::CondBr {
                cond,
                then_dest,
                else_dest,
            } => writeln!(
                f,
                "br {}, {}, {}",
                self.operand(*cond),
                self.label(*then_dest),
                self.label(*else_dest)
            ),
        }
    }
}

impl fmt::Display for IrModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "module \"{}\"", self.name)?;

        for (_, func) in self.functions.iter() {
            writeln!(f)?;
            if func.pure {
                write!(f, "pure ")?;
            }
            let params = func
                .params
                .iter()
                .enumerate()
                .map(|(idx, p)| format!("{p} %{idx}"))
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, "func @{}({}) -> {}", func.name, params, func.ret)?;

            if func.is_declaration() {
                writeln!(f, ";")?;
                continue;
            }
            writeln!(f, " {{")?;

            let printer = FunctionPrinter::new(self, func);
            for &block_id in &func.blocks {
                writeln!(f, "{}:", printer.label(block_id))?;
                for &inst in &self.blocks.get(block_id).insts {
                    printer.print_inst(f, inst)?;
                }
            }
            writeln!(f, "}}")?;
        }
        Ok(())
    }
}
