mod financial_year;
mod service;
mod staff_member;
mod target_record;

pub use financial_year::FinancialYear;
pub use service::Service;
pub use staff_member::StaffMember;
pub use target_record::TargetRecord;
