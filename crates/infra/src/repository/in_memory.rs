use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use stockroom_auth::{Account, AccountStore, LockoutState, ResourceStore};
use stockroom_core::{ListField, ListQuery, Page, ProductId, SearchFilter, StoreError, UserId, natural_cmp};
use stockroom_products::{Product, ProductField};
use stockroom_users::{User, UserField};

use super::{ProductRepository, UserRepository};

fn poisoned() -> StoreError {
    StoreError::backend("lock poisoned")
}

/// Filter, order and slice `rows` (given in creation order).
///
/// With no sort spec the page is taken in creation order and then put in
/// natural order by name, mirroring the Postgres backend.
fn paginate<T, F: ListField>(
    rows: impl Iterator<Item = T>,
    query: &ListQuery<F>,
    matches: impl Fn(&SearchFilter<F>, &T) -> bool,
    compare: impl Fn(F, &T, &T) -> Ordering,
    name: impl Fn(&T) -> &str,
) -> Page<T> {
    let mut rows: Vec<T> = match &query.search {
        Some(filter) => rows.filter(|r| matches(filter, r)).collect(),
        None => rows.collect(),
    };
    let total = rows.len() as u64;

    if let Some(spec) = &query.sort {
        rows.sort_by(|a, b| spec.apply(compare(spec.field, a, b)));
    }

    let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(query.limit()).unwrap_or(usize::MAX);
    let mut data: Vec<T> = rows.into_iter().skip(offset).take(limit).collect();

    if query.sort.is_none() {
        data.sort_by(|a, b| natural_cmp(name(a), name(b)));
    }

    Page::new(data, total, query)
}

/// In-memory user store.
///
/// Intended for tests/dev. Keyed by UUIDv7 id, so iteration follows creation order.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: RwLock<BTreeMap<UserId, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<UserId, User>>, StoreError> {
        self.users.read().map_err(|_| poisoned())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<UserId, User>>, StoreError> {
        self.users.write().map_err(|_| poisoned())
    }
}

fn email_taken(users: &BTreeMap<UserId, User>, email: &str, except: Option<UserId>) -> bool {
    users
        .values()
        .any(|u| u.email == email && Some(u.id) != except)
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn list(&self, query: &ListQuery<UserField>) -> Result<Page<User>, StoreError> {
        let users = self.read()?;
        Ok(paginate(
            users.values().cloned(),
            query,
            |filter, u| filter.matches(filter.field.text(u)),
            |field, a, b| field.text(a).cmp(field.text(b)),
            |u| &u.name,
        ))
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.values().find(|u| u.email == email).cloned())
    }

    async fn create(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.write()?;
        if email_taken(&users, &user.email, None) {
            return Err(StoreError::Duplicate(format!("email {}", user.email)));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_profile(&self, id: UserId, name: &str, email: &str) -> Result<bool, StoreError> {
        let mut users = self.write()?;
        if !users.contains_key(&id) {
            return Ok(false);
        }
        if email_taken(&users, email, Some(id)) {
            return Err(StoreError::Duplicate(format!("email {email}")));
        }
        let Some(user) = users.get_mut(&id) else {
            return Ok(false);
        };
        user.name = name.to_string();
        user.email = email.to_string();
        Ok(true)
    }

    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> Result<bool, StoreError> {
        let mut users = self.write()?;
        Ok(match users.get_mut(&id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                true
            }
            None => false,
        })
    }

    async fn delete(&self, id: UserId) -> Result<bool, StoreError> {
        Ok(self.write()?.remove(&id).is_some())
    }
}

#[async_trait]
impl AccountStore for InMemoryUserRepository {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.find_by_email(identifier).await?.map(Account::from))
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<Account>, StoreError> {
        Ok(self.get(id).await?.map(Account::from))
    }

    async fn set_lockout(&self, id: UserId, state: LockoutState) -> Result<(), StoreError> {
        if let Some(user) = self.write()?.get_mut(&id) {
            user.lockout = state;
        }
        Ok(())
    }

    async fn compare_and_set_lockout(
        &self,
        id: UserId,
        expected: LockoutState,
        next: LockoutState,
    ) -> Result<bool, StoreError> {
        let mut users = self.write()?;
        match users.get_mut(&id) {
            Some(user) if user.lockout == expected => {
                user.lockout = next;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// In-memory product store. Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryProductRepository {
    products: RwLock<BTreeMap<ProductId, Product>>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<ProductId, Product>>, StoreError> {
        self.products.read().map_err(|_| poisoned())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<ProductId, Product>>, StoreError> {
        self.products.write().map_err(|_| poisoned())
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn list(&self, query: &ListQuery<ProductField>) -> Result<Page<Product>, StoreError> {
        let products = self.read()?;
        Ok(paginate(
            products.values().cloned(),
            query,
            |filter, p| filter.field.text(p).is_some_and(|t| filter.matches(t)),
            |field, a, b| field.compare(a, b),
            |p| &p.name,
        ))
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.read()?.get(&id).cloned())
    }

    async fn create(&self, product: &Product) -> Result<(), StoreError> {
        let mut products = self.write()?;
        if products.contains_key(&product.id) {
            return Err(StoreError::Duplicate(format!("product {}", product.id)));
        }
        products.insert(product.id, product.clone());
        Ok(())
    }

    async fn update(&self, product: &Product) -> Result<bool, StoreError> {
        let mut products = self.write()?;
        Ok(match products.get_mut(&product.id) {
            Some(stored) => {
                stored.name = product.name.clone();
                stored.category = product.category.clone();
                stored.quantity = product.quantity;
                true
            }
            None => false,
        })
    }

    async fn change_price(&self, id: ProductId, price: f64) -> Result<bool, StoreError> {
        let mut products = self.write()?;
        Ok(match products.get_mut(&id) {
            Some(stored) => {
                stored.price = price;
                true
            }
            None => false,
        })
    }

    async fn delete(&self, id: ProductId) -> Result<bool, StoreError> {
        Ok(self.write()?.remove(&id).is_some())
    }
}

#[async_trait]
impl ResourceStore for InMemoryProductRepository {
    async fn exists(&self, id: ProductId) -> Result<bool, StoreError> {
        Ok(self.read()?.contains_key(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, Utc};
    use stockroom_core::{RawListQuery, SortSpec};

    fn user(name: &str, email: &str) -> User {
        User::register(name.to_string(), email.to_string(), "hash".to_string())
    }

    fn product(name: &str, category: &str, price: f64, quantity: i64) -> Product {
        Product {
            id: ProductId::new(),
            name: name.to_string(),
            category: category.to_string(),
            price,
            quantity,
        }
    }

    fn query<F: ListField>(search: Option<&str>, sort: Option<&str>, page: u32, size: u32) -> ListQuery<F> {
        ListQuery::parse(&RawListQuery {
            page_number: Some(page),
            page_size: Some(size),
            search: search.map(str::to_string),
            sort: sort.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_on_create_and_update() {
        let repo = InMemoryUserRepository::new();
        let a = user("A", "a@example.com");
        let b = user("B", "b@example.com");
        repo.create(&a).await.unwrap();
        repo.create(&b).await.unwrap();

        let err = repo.create(&user("A2", "a@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));

        let err = repo.update_profile(b.id, "B", "a@example.com").await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));

        // Keeping one's own email is fine.
        assert!(repo.update_profile(a.id, "Ann", "a@example.com").await.unwrap());
        assert_eq!(repo.get(a.id).await.unwrap().unwrap().name, "Ann");
    }

    #[tokio::test]
    async fn missing_user_updates_report_false() {
        let repo = InMemoryUserRepository::new();
        let id = UserId::new();
        assert!(!repo.update_profile(id, "x", "x@example.com").await.unwrap());
        assert!(!repo.set_password_hash(id, "h").await.unwrap());
        assert!(!repo.delete(id).await.unwrap());
    }

    #[tokio::test]
    async fn user_list_searches_sorts_and_pages() {
        let repo = InMemoryUserRepository::new();
        for (name, email) in [
            ("Carol", "carol@example.com"),
            ("alice", "alice@example.com"),
            ("Bob", "bob@corp.test"),
        ] {
            repo.create(&user(name, email)).await.unwrap();
        }

        let page = repo.list(&query(None, None, 1, 2)).await.unwrap();
        let emails: Vec<_> = page.data.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails, ["alice@example.com", "bob@corp.test"]);
        assert_eq!(page.total_pages, 2);
        assert!(page.has_next_page);

        let page = repo
            .list(&query(Some("email:EXAMPLE"), Some("name:desc"), 1, 10))
            .await
            .unwrap();
        let names: Vec<_> = page.data.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["alice", "Carol"]);
        assert_eq!(page.count, 2);
    }

    #[tokio::test]
    async fn empty_sort_orders_page_naturally_by_name() {
        let repo = InMemoryProductRepository::new();
        for name in ["item10", "item2", "item1"] {
            repo.create(&product(name, "c", 1.0, 0)).await.unwrap();
        }
        let page = repo.list(&query(None, Some(""), 1, 10)).await.unwrap();
        let names: Vec<_> = page.data.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["item1", "item2", "item10"]);
    }

    #[tokio::test]
    async fn product_list_sorts_numerically_and_ignores_numeric_search() {
        let repo = InMemoryProductRepository::new();
        repo.create(&product("a", "x", 10.0, 1)).await.unwrap();
        repo.create(&product("b", "x", 2.5, 1)).await.unwrap();
        repo.create(&product("c", "y", 7.0, 1)).await.unwrap();

        let q: ListQuery<ProductField> = query(Some("price:2.5"), Some("price:asc"), 1, 10);
        assert_eq!(q.sort, Some(SortSpec::asc(ProductField::Price)));
        let page = repo.list(&q).await.unwrap();
        let prices: Vec<_> = page.data.iter().map(|p| p.price).collect();
        assert_eq!(prices, [2.5, 7.0, 10.0]);

        let page = repo.list(&query(Some("category:Y"), None, 1, 10)).await.unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].name, "c");
    }

    #[tokio::test]
    async fn product_mutations() {
        let repo = InMemoryProductRepository::new();
        let mut p = product("Widget", "Tools", 3.0, 5);
        repo.create(&p).await.unwrap();
        assert!(repo.exists(p.id).await.unwrap());

        p.quantity = 7;
        p.price = 999.0;
        assert!(repo.update(&p).await.unwrap());
        let stored = repo.get(p.id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 7);
        assert_eq!(stored.price, 3.0);

        assert!(repo.change_price(p.id, 4.5).await.unwrap());
        assert_eq!(repo.get(p.id).await.unwrap().unwrap().price, 4.5);

        assert!(repo.delete(p.id).await.unwrap());
        assert!(!repo.exists(p.id).await.unwrap());
        assert!(!repo.change_price(p.id, 1.0).await.unwrap());
    }

    #[tokio::test]
    async fn account_view_and_lockout_compare_and_set() {
        let repo = InMemoryUserRepository::new();
        let u = user("A", "a@example.com");
        repo.create(&u).await.unwrap();

        let account = repo.find_by_identifier("a@example.com").await.unwrap().unwrap();
        assert_eq!(account.id, u.id);
        assert!(repo.find_by_identifier("A@example.com").await.unwrap().is_none());

        let one = LockoutState {
            failed_attempts: 1,
            locked_until: None,
        };
        assert!(repo
            .compare_and_set_lockout(u.id, LockoutState::default(), one)
            .await
            .unwrap());
        // Stale expectation loses.
        assert!(!repo
            .compare_and_set_lockout(u.id, LockoutState::default(), one)
            .await
            .unwrap());

        let locked = LockoutState {
            failed_attempts: 5,
            locked_until: Some(Utc::now() + TimeDelta::minutes(30)),
        };
        repo.set_lockout(u.id, locked).await.unwrap();
        assert_eq!(repo.find_by_id(u.id).await.unwrap().unwrap().lockout, locked);

        assert!(!repo
            .compare_and_set_lockout(UserId::new(), LockoutState::default(), one)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn profile_changes_do_not_touch_lockout() {
        let repo = InMemoryUserRepository::new();
        let u = user("A", "a@example.com");
        repo.create(&u).await.unwrap();
        let state = LockoutState {
            failed_attempts: 3,
            locked_until: None,
        };
        repo.set_lockout(u.id, state).await.unwrap();

        repo.update_profile(u.id, "B", "b@example.com").await.unwrap();
        repo.set_password_hash(u.id, "new-hash").await.unwrap();

        let stored = repo.get(u.id).await.unwrap().unwrap();
        assert_eq!(stored.lockout, state);
        assert_eq!(stored.password_hash, "new-hash");
    }
}
