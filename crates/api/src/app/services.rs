//! Backend selection and service wiring.

use std::sync::Arc;

use secrecy::ExposeSecret;
use thiserror::Error;

use stockroom_auth::{
    AccountStore, CredentialVerifier, LockoutPolicy, PasswordError, PasswordHasher, RequestGate,
    ResourceStore, TokenIssuer, TokenValidator,
};
use stockroom_core::StoreError;
use stockroom_infra::{
    InMemoryProductRepository, InMemoryUserRepository, PostgresProductRepository,
    PostgresUserRepository, ProductRepository, UserRepository,
};

use crate::cli::config::Config;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("storage setup failed: {0}")]
    Store(#[from] StoreError),

    #[error("password hasher setup failed: {0}")]
    Password(#[from] PasswordError),
}

/// Everything the handlers need, shared behind one `Arc`.
pub struct AppServices {
    pub users: Arc<dyn UserRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub hasher: PasswordHasher,
    pub verifier: CredentialVerifier,
    pub issuer: TokenIssuer,
}

/// Build services plus the request gate for the configured backend.
pub async fn build_services(config: &Config) -> Result<(AppServices, RequestGate), BuildError> {
    match &config.dsn {
        Some(dsn) => {
            let pool = stockroom_infra::connect(dsn.expose_secret()).await?;
            stockroom_infra::ensure_schema(&pool).await?;
            tracing::info!("using postgres stores");
            wire(
                config,
                Arc::new(PostgresUserRepository::new(pool.clone())),
                Arc::new(PostgresProductRepository::new(pool)),
            )
        }
        None => wire(
            config,
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(InMemoryProductRepository::new()),
        ),
    }
}

fn wire<U, P>(
    config: &Config,
    users: Arc<U>,
    products: Arc<P>,
) -> Result<(AppServices, RequestGate), BuildError>
where
    U: UserRepository + AccountStore + 'static,
    P: ProductRepository + ResourceStore + 'static,
{
    let secret = config.jwt_secret.expose_secret().as_bytes();
    let hasher = PasswordHasher::new(config.hash_cost)?;
    let issuer = TokenIssuer::new(secret, config.token_ttl);

    let accounts: Arc<dyn AccountStore> = users.clone();
    let resources: Arc<dyn ResourceStore> = products.clone();

    let verifier = CredentialVerifier::new(
        accounts.clone(),
        hasher.clone(),
        issuer.clone(),
        LockoutPolicy::default(),
    );
    let gate = RequestGate::new(TokenValidator::new(secret), accounts, resources);

    let services = AppServices {
        users,
        products,
        hasher,
        verifier,
        issuer,
    };
    Ok((services, gate))
}
