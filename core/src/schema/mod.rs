pub mod repair;

pub use repair::{
    minimal_object_schema, repair, unwrap_envelope, RepairRecord, RepairedSchema, WrapKind,
};
