//! Data store modules for Supabase integration

pub mod auth_admin;
pub mod catalog;
pub mod inventory;
pub mod ledger;
pub mod menu;
#[cfg(test)]
pub(crate) mod mock;
pub mod profiles;
pub mod rpc;
pub mod sales;
pub mod storage;
pub mod summaries;
pub mod supabase;

pub use auth_admin::AuthAdmin;
pub use catalog::CatalogStore;
pub use inventory::InventoryStore;
pub use ledger::LedgerStore;
pub use menu::MenuStore;
pub use profiles::ProfileStore;
pub use rpc::BackendRpc;
pub use sales::SalesStore;
pub use storage::ObjectStorage;
pub use summaries::SummaryStore;
pub use supabase::SupabaseClient;

use uuid::Uuid;

/// Every store, bound to one caller's credentials
#[derive(Clone)]
pub struct Stores {
    pub catalog: CatalogStore,
    pub inventory: InventoryStore,
    pub menu: MenuStore,
    pub sales: SalesStore,
    pub ledger: LedgerStore,
    pub summaries: SummaryStore,
    pub rpc: BackendRpc,
    pub storage: ObjectStorage,
}

impl Stores {
    pub fn new(client: SupabaseClient, bucket: &str) -> Self {
        Self {
            catalog: CatalogStore::new(client.clone()),
            inventory: InventoryStore::new(client.clone()),
            menu: MenuStore::new(client.clone()),
            sales: SalesStore::new(client.clone()),
            ledger: LedgerStore::new(client.clone()),
            summaries: SummaryStore::new(client.clone()),
            rpc: BackendRpc::new(client.clone()),
            storage: ObjectStorage::new(client, bucket),
        }
    }
}

/// Comma-separated ids for PostgREST `in.(...)` filters
pub(crate) fn in_list(ids: &[Uuid]) -> String {
    ids.iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_list_joins_ids() {
        let a = Uuid::nil();
        let b = Uuid::from_u128(1);
        assert_eq!(
            in_list(&[a, b]),
            "00000000-0000-0000-0000-000000000000,00000000-0000-0000-0000-000000000001"
        );
        assert_eq!(in_list(&[]), "");
    }
}
