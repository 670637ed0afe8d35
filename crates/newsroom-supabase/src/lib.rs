//! Supabase adapter: PostgREST for row access, the realtime websocket for
//! change notifications. Implements the core data and live-channel ports.

mod realtime;
mod rest;

pub use realtime::SupabaseRealtime;
pub use rest::SupabaseRest;
