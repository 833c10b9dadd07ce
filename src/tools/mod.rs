pub mod erp;
