//! Tenant provisioning: system templates, registration saga, and the
//! external consumer registry it compensates against.

pub mod consumer;
pub mod registration;
pub mod seed;

pub use consumer::{ConsumerRegistry, ConsumerRegistryError, ConsumerRequest, GatewayConsumer, HttpConsumerRegistry, InMemoryConsumerRegistry};
pub use registration::{CompensationError, RegisteredTenant, Registration, RegistrationSaga, RegistrationState};
pub use seed::{seed_system_roles, SeedReport};
