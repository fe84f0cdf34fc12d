pub mod assistant;
pub mod catalog;
pub mod domain;
pub mod enrichment;
pub mod error;
pub mod lending;
pub mod policy;
pub mod ports;
pub mod users;
pub mod validation;

pub use assistant::CatalogAssistant;
pub use catalog::CatalogService;
pub use domain::{
    Actor, AssistantReply, Book, BookFilter, BookInput, BookStatus, Loan, MetadataRequest,
    MetadataSuggestion, NewUser, Role, SuggestionSource, User, UserCredentials,
};
pub use enrichment::MetadataAdvisor;
pub use error::{LibraryError, LibraryResult};
pub use lending::LoanService;
pub use policy::{authorize, permits, Operation};
pub use ports::{CatalogChatService, LibraryStore, MetadataEnrichmentService, PortError, PortResult};
pub use users::UserService;
