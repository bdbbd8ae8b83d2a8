// Export music utilities
pub mod audio_sources;
pub mod event_handlers;
pub mod music_manager;
pub mod session_registry;
