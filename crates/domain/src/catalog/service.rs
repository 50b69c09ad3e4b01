//! Catalog service.

use std::sync::Arc;

use document_store::DocumentStore;

use super::model::{MAX_PRODUCT_IMAGES, check_stock};
use super::{CatalogError, Category, NewProduct, Product};
use crate::access::{Capability, Principal, authorize};
use crate::assets::{AssetStore, Upload};
use crate::error::DomainError;
use crate::repository::{Change, Repository};
use crate::value_objects::{CategoryId, ProductId};

/// Default page size for product listings.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Narrows a product listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub category: Option<CategoryId>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Service for managing catalog products and categories.
pub struct CatalogService<S: DocumentStore> {
    products: Repository<S, Product>,
    categories: Repository<S, Category>,
    assets: Arc<dyn AssetStore>,
}

impl<S: DocumentStore + Clone> CatalogService<S> {
    /// Creates a new catalog service.
    pub fn new(store: S, assets: Arc<dyn AssetStore>) -> Self {
        Self {
            products: Repository::new(store.clone()),
            categories: Repository::new(store),
            assets,
        }
    }
}

impl<S: DocumentStore> CatalogService<S> {
    /// Deletes uploads whose owning write never happened.
    async fn discard(&self, urls: &[String]) {
        for url in urls {
            if let Err(e) = self.assets.delete(url).await {
                tracing::warn!(%url, error = %e, "failed to delete orphaned asset");
            }
        }
    }

    /// Lists a new product owned by the calling seller.
    ///
    /// Every image is checked before any is stored. Stored images are
    /// removed again if the product cannot be written.
    #[tracing::instrument(skip(self, new_product, images), fields(title = %new_product.title, images = images.len()))]
    pub async fn create_product(
        &self,
        principal: &Principal,
        new_product: NewProduct,
        images: Vec<Upload>,
    ) -> Result<Product, DomainError> {
        authorize(principal, Capability::ManageCatalog, None)?;
        new_product.validate()?;
        if images.len() > MAX_PRODUCT_IMAGES {
            return Err(CatalogError::InvalidProduct(format!(
                "at most {MAX_PRODUCT_IMAGES} images are allowed"
            ))
            .into());
        }
        for image in &images {
            image.validate()?;
        }
        if self
            .categories
            .load(new_product.category.document_id())
            .await?
            .is_none()
        {
            return Err(CatalogError::InvalidProduct("category does not exist".into()).into());
        }

        let mut urls = Vec::with_capacity(images.len());
        for image in images {
            match self.assets.upload(image).await {
                Ok(url) => urls.push(url),
                Err(e) => {
                    self.discard(&urls).await;
                    return Err(e.into());
                }
            }
        }

        let product = Product::new(principal.user_id, new_product, urls.clone());
        match self.products.insert(product).await {
            Ok(stored) => {
                tracing::info!(product_id = %stored.entity.id, "product created");
                Ok(stored.entity)
            }
            Err(e) => {
                self.discard(&urls).await;
                Err(e)
            }
        }
    }

    /// Loads a product by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_product(&self, product_id: ProductId) -> Result<Product, DomainError> {
        self.products
            .load(product_id.document_id())
            .await?
            .map(|stored| stored.entity)
            .ok_or_else(|| CatalogError::ProductNotFound(product_id).into())
    }

    /// Lists products, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>, DomainError> {
        let mut query = self
            .products
            .query()
            .limit(filter.limit.unwrap_or(DEFAULT_PAGE_SIZE))
            .offset(filter.offset.unwrap_or(0));
        if let Some(category) = filter.category {
            query = query.field_eq("category", serde_json::to_value(category)?);
        }
        Ok(self
            .products
            .find(query)
            .await?
            .into_iter()
            .map(|stored| stored.entity)
            .collect())
    }

    /// Uploads an image and appends it to the product's gallery.
    #[tracing::instrument(skip(self, image), fields(size = image.bytes.len()))]
    pub async fn add_product_image(
        &self,
        principal: &Principal,
        product_id: ProductId,
        image: Upload,
    ) -> Result<Product, DomainError> {
        let product = self.get_product(product_id).await?;
        authorize(principal, Capability::ManageCatalog, Some(product.seller_id))?;
        let gallery_full = || {
            CatalogError::InvalidProduct(format!(
                "at most {MAX_PRODUCT_IMAGES} images are allowed"
            ))
        };
        if product.images.len() >= MAX_PRODUCT_IMAGES {
            return Err(gallery_full().into());
        }

        let url = self.assets.upload(image).await?;

        let result = self
            .products
            .mutate(product_id.document_id(), |current| {
                let mut product = current.ok_or(CatalogError::ProductNotFound(product_id))?;
                if product.images.len() >= MAX_PRODUCT_IMAGES {
                    return Err(gallery_full().into());
                }
                product.images.push(url.clone());
                product.updated_at = chrono::Utc::now();
                Ok(Change::Put(product))
            })
            .await;

        match result {
            Ok(committed) => committed
                .into_entity()
                .ok_or_else(|| CatalogError::ProductNotFound(product_id).into()),
            Err(e) => {
                self.discard(std::slice::from_ref(&url)).await;
                Err(e)
            }
        }
    }

    /// Adds or replaces the caller's review of a product.
    #[tracing::instrument(skip(self, comment))]
    pub async fn add_review(
        &self,
        principal: &Principal,
        product_id: ProductId,
        rating: u8,
        comment: Option<String>,
    ) -> Result<Product, DomainError> {
        authorize(principal, Capability::ReviewProduct, None)?;

        let committed = self
            .products
            .mutate(product_id.document_id(), |current| {
                let mut product = current.ok_or(CatalogError::ProductNotFound(product_id))?;
                product.add_review(principal.user_id, rating, comment.clone())?;
                Ok(Change::Put(product))
            })
            .await?;

        committed
            .into_entity()
            .ok_or_else(|| CatalogError::ProductNotFound(product_id).into())
    }

    /// Sets the available stock of a product.
    #[tracing::instrument(skip(self))]
    pub async fn update_stock(
        &self,
        principal: &Principal,
        product_id: ProductId,
        stock: u32,
    ) -> Result<Product, DomainError> {
        check_stock(stock)?;

        let committed = self
            .products
            .mutate(product_id.document_id(), |current| {
                let mut product = current.ok_or(CatalogError::ProductNotFound(product_id))?;
                authorize(principal, Capability::ManageCatalog, Some(product.seller_id))?;
                product.stock = stock;
                product.updated_at = chrono::Utc::now();
                Ok(Change::Put(product))
            })
            .await?;

        committed
            .into_entity()
            .ok_or_else(|| CatalogError::ProductNotFound(product_id).into())
    }

    /// Removes a product and its images.
    ///
    /// Carts and orders that already hold a line for it keep their snapshot.
    #[tracing::instrument(skip(self))]
    pub async fn delete_product(
        &self,
        principal: &Principal,
        product_id: ProductId,
    ) -> Result<(), DomainError> {
        let product = self.get_product(product_id).await?;
        authorize(principal, Capability::ManageCatalog, Some(product.seller_id))?;

        if !self.products.delete(product_id.document_id()).await? {
            return Err(CatalogError::ProductNotFound(product_id).into());
        }
        for url in &product.images {
            self.assets.delete(url).await?;
        }

        tracing::info!(%product_id, "product deleted");
        Ok(())
    }

    /// Creates a category from a name and a cover image.
    #[tracing::instrument(skip(self, image))]
    pub async fn create_category(
        &self,
        principal: &Principal,
        name: &str,
        image: Option<Upload>,
    ) -> Result<Category, DomainError> {
        authorize(principal, Capability::ManageCategories, None)?;
        let name = Category::validate_name(name)?;
        let image = image
            .ok_or_else(|| CatalogError::InvalidCategory("name and image are required".into()))?;
        image.validate()?;

        let id = CategoryId::for_name(name);
        if self.categories.load(id.document_id()).await?.is_some() {
            return Err(CatalogError::DuplicateCategory(name.to_string()).into());
        }

        let url = self.assets.upload(image).await?;
        match self.categories.insert(Category::new(name, url.clone())).await {
            Ok(stored) => {
                tracing::info!(category_id = %id, name, "category created");
                Ok(stored.entity)
            }
            Err(e) => {
                self.discard(std::slice::from_ref(&url)).await;
                match e {
                    DomainError::Conflict(_) => {
                        Err(CatalogError::DuplicateCategory(name.to_string()).into())
                    }
                    other => Err(other),
                }
            }
        }
    }

    /// Loads a category by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_category(&self, category_id: CategoryId) -> Result<Category, DomainError> {
        self.categories
            .load(category_id.document_id())
            .await?
            .map(|stored| stored.entity)
            .ok_or_else(|| CatalogError::CategoryNotFound(category_id).into())
    }

    /// Lists every category, sorted by name.
    pub async fn list_categories(&self) -> Result<Vec<Category>, DomainError> {
        let mut categories: Vec<Category> = self
            .categories
            .find(self.categories.query())
            .await?
            .into_iter()
            .map(|stored| stored.entity)
            .collect();
        categories.sort_by_key(|c| c.name.to_lowercase());
        Ok(categories)
    }

    /// Removes a category that no product uses.
    #[tracing::instrument(skip(self))]
    pub async fn delete_category(
        &self,
        principal: &Principal,
        category_id: CategoryId,
    ) -> Result<(), DomainError> {
        authorize(principal, Capability::ManageCategories, None)?;
        let category = self.get_category(category_id).await?;

        let in_use = self
            .products
            .find_one(
                self.products
                    .query()
                    .field_eq("category", serde_json::to_value(category_id)?)
                    .limit(1),
            )
            .await?;
        if in_use.is_some() {
            return Err(CatalogError::CategoryInUse(category_id).into());
        }

        if !self.categories.delete(category_id.document_id()).await? {
            return Err(CatalogError::CategoryNotFound(category_id).into());
        }
        self.assets.delete(&category.image).await?;

        tracing::info!(%category_id, "category deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Role;
    use crate::assets::InMemoryAssetStore;
    use crate::catalog::MAX_STOCK;
    use crate::error::ErrorKind;
    use crate::value_objects::{Money, UserId};
    use document_store::InMemoryDocumentStore;

    fn fields() -> NewProduct {
        NewProduct {
            title: "Espresso grinder".into(),
            description: "Conical burr grinder with stepless adjustment for espresso and pour-over."
                .into(),
            category: CategoryId::for_name("kitchen"),
            price: Money::from_cents(19900),
            stock: 3,
        }
    }

    fn png() -> Upload {
        Upload::new(vec![1, 2, 3], "image/png")
    }

    fn admin() -> Principal {
        Principal::new(UserId::new(), Role::Admin)
    }

    async fn setup() -> (CatalogService<InMemoryDocumentStore>, InMemoryAssetStore) {
        let assets = InMemoryAssetStore::default();
        let service = CatalogService::new(InMemoryDocumentStore::new(), Arc::new(assets.clone()));
        service
            .create_category(&admin(), "Kitchen", Some(png()))
            .await
            .unwrap();
        (service, assets)
    }

    fn seller() -> Principal {
        Principal::new(UserId::new(), Role::Seller)
    }

    #[tokio::test]
    async fn test_create_requires_seller() {
        let (service, _) = setup().await;
        let buyer = Principal::new(UserId::new(), Role::User);

        let err = service
            .create_product(&buyer, fields(), Vec::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let product = service
            .create_product(&seller(), fields(), Vec::new())
            .await
            .unwrap();
        assert_eq!(service.get_product(product.id).await.unwrap(), product);
    }

    #[tokio::test]
    async fn test_create_validates_fields() {
        let (service, assets) = setup().await;
        let mut f = fields();
        f.description = "short".into();

        let err = service
            .create_product(&seller(), f, vec![png()])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(service.list_products(ProductFilter::default()).await.unwrap().is_empty());
        assert_eq!(assets.len(), 1);
    }

    #[tokio::test]
    async fn test_create_requires_existing_category() {
        let (service, assets) = setup().await;
        let mut f = fields();
        f.category = CategoryId::for_name("garden");

        let err = service
            .create_product(&seller(), f, vec![png()])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(assets.len(), 1);
    }

    #[tokio::test]
    async fn test_create_with_images() {
        let (service, assets) = setup().await;

        let product = service
            .create_product(&seller(), fields(), vec![png(), Upload::new(vec![7], "image/jpeg")])
            .await
            .unwrap();
        assert_eq!(product.images.len(), 2);
        assert!(product.images.iter().all(|url| assets.contains(url)));
        assert_eq!(product.primary_image(), product.images.first().cloned());

        // One bad file rejects the whole request before anything is stored.
        let before = assets.len();
        let err = service
            .create_product(&seller(), fields(), vec![png(), Upload::new(vec![1], "text/plain")])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(assets.len(), before);

        let too_many = vec![png(); MAX_PRODUCT_IMAGES + 1];
        let err = service
            .create_product(&seller(), fields(), too_many)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(assets.len(), before);
    }

    #[tokio::test]
    async fn test_list_products_by_category() {
        let (service, _) = setup().await;
        service
            .create_category(&admin(), "Garden", Some(png()))
            .await
            .unwrap();
        let owner = seller();
        service
            .create_product(&owner, fields(), Vec::new())
            .await
            .unwrap();
        let mut garden = fields();
        garden.title = "Hose reel".into();
        garden.category = CategoryId::for_name("garden");
        service.create_product(&owner, garden, Vec::new()).await.unwrap();

        let all = service.list_products(ProductFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let filter = ProductFilter {
            category: Some(CategoryId::for_name("Garden")),
            ..Default::default()
        };
        let listed = service.list_products(filter).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Hose reel");
    }

    #[tokio::test]
    async fn test_get_missing_product() {
        let (service, _) = setup().await;
        let err = service.get_product(ProductId::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_images_are_owned_by_seller() {
        let (service, assets) = setup().await;
        let owner = seller();
        let product = service
            .create_product(&owner, fields(), Vec::new())
            .await
            .unwrap();

        let updated = service
            .add_product_image(&owner, product.id, png())
            .await
            .unwrap();
        assert_eq!(updated.images.len(), 1);

        let other = seller();
        let err = service
            .add_product_image(&other, product.id, png())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert_eq!(assets.len(), 2);

        let err = service
            .add_product_image(&owner, product.id, Upload::new(vec![1], "text/plain"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_gallery_is_capped() {
        let (service, assets) = setup().await;
        let owner = seller();
        let product = service
            .create_product(&owner, fields(), vec![png(); MAX_PRODUCT_IMAGES])
            .await
            .unwrap();
        let before = assets.len();

        let err = service
            .add_product_image(&owner, product.id, png())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(assets.len(), before);
    }

    #[tokio::test]
    async fn test_review_and_stock_updates() {
        let (service, _) = setup().await;
        let owner = seller();
        let product = service
            .create_product(&owner, fields(), Vec::new())
            .await
            .unwrap();

        let buyer = Principal::new(UserId::new(), Role::User);
        let reviewed = service
            .add_review(&buyer, product.id, 5, Some("Great".into()))
            .await
            .unwrap();
        assert_eq!(reviewed.reviews.len(), 1);

        let err = service.update_stock(&buyer, product.id, 10).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let restocked = service.update_stock(&owner, product.id, 10).await.unwrap();
        assert_eq!(restocked.stock, 10);

        let err = service
            .update_stock(&owner, product.id, MAX_STOCK + 1)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(service.get_product(product.id).await.unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_delete_product_removes_images() {
        let (service, assets) = setup().await;
        let owner = seller();
        let product = service
            .create_product(&owner, fields(), vec![Upload::new(vec![9], "image/jpeg")])
            .await
            .unwrap();

        service.delete_product(&owner, product.id).await.unwrap();
        assert_eq!(assets.len(), 1);

        let err = service.get_product(product.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_category_rules() {
        let (service, assets) = setup().await;

        let err = service
            .create_category(&seller(), "Garden", Some(png()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = service
            .create_category(&admin(), "Garden", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = service
            .create_category(&admin(), " kitchen ", Some(png()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Catalog(CatalogError::DuplicateCategory(_))
        ));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(assets.len(), 1);

        let garden = service
            .create_category(&admin(), "Garden", Some(png()))
            .await
            .unwrap();
        assert_eq!(service.get_category(garden.id).await.unwrap(), garden);
        let names: Vec<_> = service
            .list_categories()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Garden", "Kitchen"]);
    }

    #[tokio::test]
    async fn test_delete_category_in_use() {
        let (service, assets) = setup().await;
        let kitchen = CategoryId::for_name("kitchen");
        let owner = seller();
        let product = service
            .create_product(&owner, fields(), Vec::new())
            .await
            .unwrap();

        let err = service.delete_category(&admin(), kitchen).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        service.delete_product(&owner, product.id).await.unwrap();
        service.delete_category(&admin(), kitchen).await.unwrap();
        assert!(assets.is_empty());

        let err = service.get_category(kitchen).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        // The name is free again.
        service
            .create_category(&admin(), "Kitchen", Some(png()))
            .await
            .unwrap();
    }
}
