//! The IR builder
//!
//! Owns the module under construction and an insertion point. Every
//! `create_*` call appends an instruction value at the insertion point and
//! returns its id.

use super::{
    BasicBlock, BlockId, CmpPred, FuncId, InstKind, IrFunction, IrModule, IrType, IrValue,
    IrValueKind, ValueId,
};

pub struct IrBuilder {
    pub module: IrModule,
    insert_point: Option<BlockId>,
}

impl IrBuilder {
    pub fn new(module: IrModule) -> Self {
        Self {
            module,
            insert_point: None,
        }
    }

    pub fn set_insert_point(&mut self, block: BlockId) {
        self.insert_point = Some(block);
    }

    pub fn insert_point(&self) -> Option<BlockId> {
        self.insert_point
    }

    pub fn create_function(
        &mut self,
        name: impl Into<String>,
        ret: IrType,
        params: Vec<IrType>,
        pure: bool,
    ) -> FuncId {
        let func = self.module.functions.alloc(IrFunction {
            name: name.into(),
            ret: ret.clone(),
            params: params.clone(),
            pure,
            args: Vec::new(),
            blocks: Vec::new(),
            // Patched right below, once the function value exists.
            value: ValueId::new(0),
        });
        let value = self.module.values.alloc(IrValue {
            ty: IrType::Function {
                ret: Box::new(ret),
                params: params.clone(),
            },
            kind: IrValueKind::Function(func),
        });
        let args = params
            .iter()
            .enumerate()
            .map(|(index, ty)| {
                self.module.values.alloc(IrValue {
                    ty: ty.clone(),
                    kind: IrValueKind::Argument {
                        function: func,
                        index,
                    },
                })
            })
            .collect();

        let entry = self.module.functions.get_mut(func);
        entry.value = value;
        entry.args = args;
        func
    }

    pub fn create_block(&mut self, func: FuncId) -> BlockId {
        let block = self.module.blocks.alloc(BasicBlock {
            function: func,
            insts: Vec::new(),
            predecessors: Vec::new(),
        });
        self.module.functions.get_mut(func).blocks.push(block);
        block
    }

    pub fn const_int(&mut self, ty: IrType, value: i64) -> ValueId {
        self.module.values.alloc(IrValue {
            ty,
            kind: IrValueKind::ConstInt(value),
        })
    }

    pub fn const_string(&mut self, value: impl Into<String>) -> ValueId {
        self.module.values.alloc(IrValue {
            ty: IrType::Ptr(Box::new(IrType::Int(8))),
            kind: IrValueKind::ConstStr(value.into()),
        })
    }

    fn insert(&mut self, ty: IrType, kind: InstKind) -> ValueId {
        let block = self
            .insert_point
            .expect("instruction created without an insertion point");
        let value = self.module.values.alloc(IrValue {
            ty,
            kind: IrValueKind::Inst { block, kind },
        });
        self.module.blocks.get_mut(block).insts.push(value);
        value
    }

    pub fn create_alloca(&mut self, allocated: IrType) -> ValueId {
        self.insert(
            IrType::Ptr(Box::new(allocated.clone())),
            InstKind::Alloca { allocated },
        )
    }

    pub fn create_load(&mut self, ptr: ValueId) -> ValueId {
        let ty = match &self.module.value(ptr).ty {
            IrType::Ptr(inner) => (**inner).clone(),
            other => other.clone(),
        };
        self.insert(ty, InstKind::Load { ptr })
    }

    pub fn create_store(&mut self, ptr: ValueId, value: ValueId) -> ValueId {
        self.insert(IrType::Void, InstKind::Store { ptr, value })
    }

    pub fn create_struct_gep(&mut self, ptr: ValueId, index: usize) -> ValueId {
        let ty = match &self.module.value(ptr).ty {
            IrType::Ptr(inner) => match &**inner {
                IrType::Struct(fields) if index < fields.len() => {
                    IrType::Ptr(Box::new(fields[index].clone()))
                }
                _ => IrType::Ptr(Box::new(IrType::Int(8))),
            },
            _ => IrType::Ptr(Box::new(IrType::Int(8))),
        };
        self.insert(ty, InstKind::StructGep { ptr, index })
    }

    pub fn create_ptr_cast(&mut self, value: ValueId, to: IrType) -> ValueId {
        self.insert(to, InstKind::PtrCast { value })
    }

    pub fn create_int_cast(&mut self, value: ValueId, to: IrType) -> ValueId {
        self.insert(to, InstKind::IntCast { value })
    }

    pub fn create_addr_of(&mut self, value: ValueId) -> ValueId {
        let ty = IrType::Ptr(Box::new(self.module.value(value).ty.clone()));
        self.insert(ty, InstKind::AddrOf { value })
    }

    pub fn create_call(&mut self, callee: ValueId, args: Vec<ValueId>) -> ValueId {
        let ret = match &self.module.value(callee).ty {
            IrType::Function { ret, .. } => (**ret).clone(),
            IrType::Ptr(inner) => match &**inner {
                IrType::Function { ret, .. } => (**ret).clone(),
                _ => IrType::Void,
            },
            _ => IrType::Void,
        };
        self.insert(ret, InstKind::Call { callee, args })
    }

    pub fn create_ret(&mut self, value: Option<ValueId>) -> ValueId {
        self.insert(IrType::Void, InstKind::Ret { value })
    }

    pub fn create_add(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId {
        let ty = self.module.value(lhs).ty.clone();
        self.insert(ty, InstKind::Add { lhs, rhs })
    }

    pub fn create_sub(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId {
        let ty = self.module.value(lhs).ty.clone();
        self.insert(ty, InstKind::Sub { lhs, rhs })
    }

    pub fn create_mul(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId {
        let ty = self.module.value(lhs).ty.clone();
        self.insert(ty, InstKind::Mul { lhs, rhs })
    }

    pub fn create_div(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId {
        let ty = self.module.value(lhs).ty.clone();
        self.insert(ty, InstKind::Div { lhs, rhs })
    }

    pub fn create_cmp(&mut self, pred: CmpPred, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.insert(IrType::Bool, InstKind::Cmp { pred, lhs, rhs })
    }

    pub fn create_br(&mut self, dest: BlockId) -> ValueId {
        let current = self
            .insert_point
            .expect("branch created without an insertion point");
        self.module.blocks.get_mut(dest).predecessors.push(current);
        self.insert(IrType::Void, InstKind::Br { dest })
    }

    pub fn create_cond_br(
        &mut self,
        cond: ValueId,
        then_dest: BlockId,
        else_dest: BlockId,
    ) -> ValueId {
        let current = self
            .insert_point
            .expect("branch created without an insertion point");
        self.module
            .blocks
            .get_mut(then_dest)
            .predecessors
            .push(current);
        self.module
            .blocks
            .get_mut(else_dest)
            .predecessors
            .push(current);
        self.insert(
            IrType::Void,
            InstKind::CondBr {
                cond,
                then_dest,
                else_dest,
            },
        )
    }

    /// Remove an instruction from its block. The value slot stays allocated
    /// so existing operand references remain valid.
    pub fn erase_instruction(&mut self, value: ValueId) {
        if let IrValueKind::Inst { block, .. } = &self.module.value(value).kind {
            let block = *block;
            self.module
                .blocks
                .get_mut(block)
                .insts
                .retain(|&inst| inst != value);
        }
    }

    /// Whether the current block already ends in a terminator.
    pub fn block_terminated(&self) -> bool {
        let Some(block) = self.insert_point else {
            return false;
        };
        let Some(&last) = self.module.blocks.get(block).insts.last() else {
            return false;
        };
        matches!(
            &self.module.value(last).kind,
            IrValueKind::Inst {
                kind: InstKind::Ret { .. } | InstKind::Br { .. } | InstKind::CondBr { .. },
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_and_print_return_constant() {
        let mut builder = IrBuilder::new(IrModule::new("test.vpr"));
        let func = builder.create_function("main", IrType::Int(32), Vec::new(), false);
        let entry = builder.create_block(func);
        builder.set_insert_point(entry);
        let zero = builder.const_int(IrType::Int(32), 0);
        builder.create_ret(Some(zero));

        let printed = builder.module.to_string();
        assert!(printed.contains("func @main() -> i32"));
        assert!(printed.contains("ret i32 0"));
    }

    #[test]
    fn erase_instruction_removes_from_block() {
        let mut builder = IrBuilder::new(IrModule::new("test.vpr"));
        let func = builder.create_function("f", IrType::Int(32), Vec::new(), false);
        let entry = builder.create_block(func);
        builder.set_insert_point(entry);
        let slot = builder.create_alloca(IrType::Int(32));
        let load = builder.create_load(slot);
        assert_eq!(builder.module.pointer_operand(load), Some(slot));

        builder.erase_instruction(load);
        assert_eq!(builder.module.blocks.get(entry).insts.len(), 1);
    }

    #[test]
    fn branches_record_predecessors() {
        let mut builder = IrBuilder::new(IrModule::new("test.vpr"));
        let func = builder.create_function("f", IrType::Void, Vec::new(), false);
        let entry = builder.create_block(func);
        let exit = builder.create_block(func);
        builder.set_insert_point(entry);
        builder.create_br(exit);
        assert_eq!(builder.module.blocks.get(exit).predecessors, vec![entry]);
        assert!(builder.block_terminated());
    }
}
