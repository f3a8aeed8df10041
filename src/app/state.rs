//! Application state shared across routes

use std::sync::Arc;

use crate::buffer::SaleBuffers;
use crate::config::Config;
use crate::store::supabase::SupabaseError;
use crate::store::{AuthAdmin, ProfileStore, Stores, SupabaseClient};
use crate::util::rate_limit::{create_user_limiter, UserLimiter};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Service-role client; never hand it to request-scoped stores
    pub supabase: SupabaseClient,
    pub profile_store: ProfileStore,
    pub auth_admin: AuthAdmin,
    pub sale_buffers: Arc<SaleBuffers>,
    pub limiter: Arc<UserLimiter>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, SupabaseError> {
        let config = Arc::new(config);

        // Initialize Supabase client
        let supabase = SupabaseClient::new(&config)?;

        // Role lookups and account creation run with the service key
        let profile_store = ProfileStore::new(supabase.clone());
        let auth_admin = AuthAdmin::new(supabase.clone());

        let sale_buffers = Arc::new(SaleBuffers::new(config.max_buffer_entries));
        let limiter = create_user_limiter(config.rate_limit_per_second);

        Ok(Self {
            config,
            supabase,
            profile_store,
            auth_admin,
            sale_buffers,
            limiter,
        })
    }

    /// Stores acting with the caller's own token so row-level security applies
    pub fn stores_for(&self, access_token: &str) -> Stores {
        Stores::new(
            self.supabase.as_user(access_token),
            &self.config.storage_bucket,
        )
    }
}
