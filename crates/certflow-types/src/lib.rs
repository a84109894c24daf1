pub mod event;
pub mod html;
pub mod layout;
pub mod participant;
pub mod participation;
pub mod status;

pub use event::{Event, EventMetadata};
pub use html::escape_html;
pub use layout::{Align, FieldDescriptor, LayoutError};
pub use participant::{Participant, Recipient};
pub use participation::{
    new_certificate_id, sanitize_name, DeliveryStatus, EventParticipation, GenerationStatus,
    ParticipationFilter,
};
pub use status::{DeliveryCounts, EventStatus, GenerationCounts};
