pub mod supabase;

pub use supabase::SupabaseStorage;

use anyhow::Result;

/// Object storage holding the uploaded evidence images.
///
/// `public_url` is a pure address computation and always succeeds; whether
/// the bucket actually serves it unauthenticated is a separate question the
/// caller answers with a reachability probe.
pub trait ObjectStorage: Send + Sync {
    fn upload(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<()>;

    fn public_url(&self, path: &str) -> String;

    /// Time-limited pre-authorized URL for a private object.
    fn signed_url(&self, path: &str, ttl_seconds: u32) -> Result<String>;
}
