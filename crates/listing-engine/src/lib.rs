pub mod config;
pub mod encoder;
pub mod error;
pub mod present;
pub mod request;
pub mod response;
pub mod service;
pub mod session;

pub use config::{parse_dotenv, ServiceConfig};
pub use encoder::{encode_all, encode_image, EncodedImage, SelectedImage};
pub use error::{GenerationError, SessionError};
pub use present::{Clipboard, CopyField, ListingView, MemoryClipboard, TagList};
pub use request::{build_request, GenerationRequest};
pub use response::parse_listing_response;
pub use service::{
    default_service_registry, generate_listing, DryrunService, GeminiService, ListingService,
    ServiceRegistry, ServiceReply,
};
pub use session::{ListingSession, PreviewStore, SessionPhase, SessionState};
