pub mod clients;
pub mod payroll;
pub mod unions;
