use storage::{
    LedgerStore, dto::category::CreateCategoryRequest, error::Result, models::Category,
    repository::category::CategoryRepository,
};

pub async fn list_categories(store: &dyn LedgerStore) -> Result<Vec<Category>> {
    CategoryRepository::new(store).list().await
}

pub async fn create_category(
    store: &dyn LedgerStore,
    request: &CreateCategoryRequest,
) -> Result<Category> {
    CategoryRepository::new(store).create(request).await
}

pub async fn delete_category(store: &dyn LedgerStore, id: &str) -> Result<()> {
    CategoryRepository::new(store).delete(id).await
}
