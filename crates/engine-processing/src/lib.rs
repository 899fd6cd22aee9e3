pub mod apply;
pub mod commit;
pub mod report;
pub mod rollback;
pub mod rules;
pub mod suggest;
pub mod validate;
