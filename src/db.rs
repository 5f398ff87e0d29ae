pub mod admin_repo;
pub use admin_repo::AdminRepository;
pub mod communication_repo;
pub use communication_repo::CommunicationRepository;
pub mod finance_repo;
pub use finance_repo::FinanceRepository;
pub mod member_repo;
pub use member_repo::MemberRepository;
pub mod settings_repo;
pub use settings_repo::SettingsRepository;
