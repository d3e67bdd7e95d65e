// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Runs a query against a collection and prints every page.
//!
//! ```sh
//! export COSMOS_ACCOUNT=myaccount COSMOS_DATABASE=mydb
//! export COSMOS_TOKEN=$(az account get-access-token --resource https://myaccount.documents.azure.com --query accessToken -o tsv)
//! RUST_LOG=azure_data_cosmos_rest=debug cargo run --example cosmos_query -- docs "SELECT * FROM c"
//! ```

use std::{env, error::Error, sync::Arc};

use async_trait::async_trait;
use azure_core::credentials::{AccessToken, TokenCredential, TokenRequestOptions};
use azure_data_cosmos_rest::{
    credentials::TokenClaims, ConnectionOptions, CosmosConnection, QueryOptions,
};
use futures::TryStreamExt;
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;

/// Hands out a token acquired outside the process.
#[derive(Debug)]
struct EnvironmentToken(String);

#[async_trait]
impl TokenCredential for EnvironmentToken {
    async fn get_token(
        &self,
        _scopes: &[&str],
        _options: Option<TokenRequestOptions<'_>>,
    ) -> azure_core::Result<AccessToken> {
        let token = AccessToken::new(self.0.clone(), OffsetDateTime::now_utc());
        // Opaque tokens are assumed to be fresh.
        let expires_on = TokenClaims::decode(&token)
            .ok()
            .and_then(|claims| claims.expires_on)
            .unwrap_or_else(|| OffsetDateTime::now_utc() + time::Duration::hours(1));
        Ok(AccessToken::new(self.0.clone(), expires_on))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let account = env::var("COSMOS_ACCOUNT")?;
    let database = env::var("COSMOS_DATABASE")?;
    let credential = Arc::new(EnvironmentToken(env::var("COSMOS_TOKEN")?));

    let mut args = env::args().skip(1);
    let collection = args.next().ok_or("missing collection argument")?;
    let query = args.next().unwrap_or_else(|| "SELECT * FROM c".to_string());

    let options = ConnectionOptions::from_env()?;
    let connection = CosmosConnection::connect(account, database, credential, Some(options))?;
    let client = connection.collection_client(&collection);

    let query_options = QueryOptions {
        auto_continue: true,
        ..Default::default()
    };
    let mut pages = client.query_documents::<serde_json::Value>(query, Some(query_options))?;
    let mut charge = 0;
    while let Some(page) = pages.try_next().await? {
        charge += page.charge.max(0);
        println!("Results Page");
        println!("  Items:");
        for item in page.body.map(|p| p.into_items()).unwrap_or_default() {
            println!("    * {:#?}", item);
        }
    }
    println!("Total charge: {} RU", charge);
    println!("Throttle rounds: {}", connection.throttle_rounds());
    Ok(())
}
