// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Each aggregate has its own subdirectory with:
// - Value objects
// - Events
// - Commands
// - Errors
// - Aggregate implementation
//
// Persistence and authorization live outside this layer.
//
// ============================================================================

pub mod core;
pub mod firma;
pub mod malzeme;
pub mod ihale;
pub mod siparis;
pub mod user;
pub mod notification;
