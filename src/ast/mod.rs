//! Migration IR.
//!
//! Plain data describing schema changes. Nothing here knows about SQL;
//! the transpiler turns these shapes into statements per dialect.

pub mod migration;
pub mod objects;
pub mod table;
pub mod values;

pub use self::migration::{Direction, IsolationLevel, Migration, Operation, TransactionConfig};
pub use self::objects::{
    CreateEnum, CreateFunction, CreateProcedure, CreateTrigger, CreateView, DeleteData,
    DropObject, DropRowPolicy, DropTrigger, Rename, RenameTrigger, TriggerEvent, TriggerTiming,
};
pub use self::table::{AddColumn, AlterTable, Column, CreateTable, ForeignKey, ReferentialAction, RenameColumn};
pub use self::values::Value;
