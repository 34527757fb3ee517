// IGDB (Internet Game Database) v4 client
// Docs: https://api-docs.igdb.com
use crate::error::LookupError;
use crate::models::{DataSource, GameInfo};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const IGDB_BASE_URL: &str = "https://api.igdb.com/v4";

#[async_trait]
pub trait GameDatabase: Send + Sync {
    /// Best match for `name`, `None` when the database has no result.
    async fn search_game(&self, name: &str) -> Result<Option<GameInfo>, LookupError>;
}

#[derive(Debug, Clone)]
pub struct IgdbClient {
    client: Client,
    client_id: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct IgdbGame {
    name: Option<String>,
    summary: Option<String>,
    first_release_date: Option<i64>,
    #[serde(default)]
    platforms: Vec<Named>,
    #[serde(default)]
    genres: Vec<Named>,
    #[serde(default)]
    involved_companies: Vec<InvolvedCompany>,
    rating: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct InvolvedCompany {
    company: Option<Named>,
    #[serde(default)]
    developer: bool,
    #[serde(default)]
    publisher: bool,
}

impl IgdbClient {
    pub fn new(client_id: String, access_token: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            client_id,
            access_token,
        }
    }

    fn to_game_info(query_name: &str, game: IgdbGame) -> GameInfo {
        let company = |pick: fn(&InvolvedCompany) -> bool| {
            game.involved_companies
                .iter()
                .find(|c| pick(c))
                .and_then(|c| c.company.as_ref())
                .map(|c| c.name.clone())
        };
        GameInfo {
            name: game.name.clone().unwrap_or_else(|| query_name.to_string()),
            developer: company(|c| c.developer),
            publisher: company(|c| c.publisher),
            release_date: game
                .first_release_date
                .and_then(|ts| DateTime::from_timestamp(ts, 0))
                .map(|dt| dt.format("%Y-%m-%d").to_string()),
            platforms: game.platforms.iter().map(|p| p.name.clone()).collect(),
            genre: game.genres.first().map(|g| g.name.clone()),
            price: None,
            description: game.summary.clone(),
            rating: game.rating,
            source: DataSource::Lookup,
        }
    }
}

#[async_trait]
impl GameDatabase for IgdbClient {
    async fn search_game(&self, name: &str) -> Result<Option<GameInfo>, LookupError> {
        let body = format!(
            "fields name,first_release_date,platforms.name,genres.name,\
             involved_companies.company.name,involved_companies.developer,\
             involved_companies.publisher,summary,rating; \
             search \"{}\"; limit 1;",
            name.replace('"', "")
        );

        let response = self
            .client
            .post(format!("{}/games", IGDB_BASE_URL))
            .header("Client-ID", &self.client_id)
            .bearer_auth(&self.access_token)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LookupError::Status {
                service: "IGDB",
                status: status.as_u16(),
                body,
            });
        }

        let games: Vec<IgdbGame> = response.json().await?;
        tracing::debug!("IGDB search '{}' returned {} result(s)", name, games.len());
        Ok(games.into_iter().next().map(|g| Self::to_game_info(name, g)))
    }
}
