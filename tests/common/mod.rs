//! Common Test Utilities
//!
//! In-memory collaborators and fixtures shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum_test::TestServer;
use chrono::Utc;
use fake::faker::address::en::CityName;
use fake::faker::lorem::en::{Sentence, Word};
use fake::faker::name::en::Name;
use fake::Fake;
use parking_lot::Mutex;
use uuid::Uuid;

use live_server::application::services::{
    AuthError, Claims, RelayError, TokenValidator, TypingRelay,
};
use live_server::config::Settings;
use live_server::domain::{ContentAuthor, ContentRecord, ContentRepository};
use live_server::presentation::websocket::{
    Collaborators, Connection, ConnectionError, OutboundFrame,
};
use live_server::shared::error::AppError;
use live_server::startup::{create_app, AppState};

/// Token accepted by [`StaticTokenValidator`]
pub const VALID_TOKEN: &str = "valid-token";

/// Subject carried by [`VALID_TOKEN`]
pub const TEST_USER_ID: &str = "7d9f3c2e-user";

/// Build a listing with faked text fields
pub fn fake_record(id: i64) -> ContentRecord {
    ContentRecord {
        id,
        title: Sentence(2..5).fake(),
        description: Sentence(5..12).fake(),
        slug: format!("listing-{}", id),
        lang: "en".to_string(),
        total: (10..5000).fake::<i32>() as f64,
        photos: vec![format!("/uploads/{}/cover.jpg", id)],
        categories: vec![Word().fake()],
        cities: vec![CityName().fake()],
        author: ContentAuthor {
            id: Uuid::new_v4(),
            name: Name().fake(),
            avatar: None,
        },
        hashtags: vec![Word().fake(), Word().fake()],
        created_at: Utc::now(),
    }
}

/// Content source returning faked listings and recording requested locales
#[derive(Default)]
pub struct FakeContentRepository {
    pub locales: Mutex<Vec<String>>,
}

#[async_trait]
impl ContentRepository for FakeContentRepository {
    async fn fetch_random(
        &self,
        count: usize,
        locale: &str,
    ) -> Result<Vec<ContentRecord>, AppError> {
        self.locales.lock().push(locale.to_string());
        Ok((1..=count as i64).map(fake_record).collect())
    }
}

/// Accepts only [`VALID_TOKEN`]
pub struct StaticTokenValidator;

#[async_trait]
impl TokenValidator for StaticTokenValidator {
    async fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        if token == VALID_TOKEN {
            Ok(Claims {
                sub: TEST_USER_ID.to_string(),
                exp: Utc::now().timestamp() + 3600,
                iat: Utc::now().timestamp(),
            })
        } else {
            Err(AuthError::InvalidToken("unknown token".to_string()))
        }
    }
}

/// Records every relayed typing indicator
#[derive(Default)]
pub struct RecordingTypingRelay {
    pub relayed: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl TypingRelay for RecordingTypingRelay {
    async fn relay_typing(&self, user_id: &str, room: &str) -> Result<(), RelayError> {
        self.relayed
            .lock()
            .push((user_id.to_string(), room.to_string()));
        Ok(())
    }
}

/// Connection that records written frames
#[derive(Default)]
pub struct FakeConnection {
    frames: Mutex<Vec<OutboundFrame>>,
}

impl FakeConnection {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn texts(&self) -> Vec<String> {
        self.frames
            .lock()
            .iter()
            .filter_map(|f| match f {
                OutboundFrame::Text(text) => Some(text.clone()),
                OutboundFrame::Binary(_) => None,
            })
            .collect()
    }

    pub fn binaries(&self) -> Vec<bytes::Bytes> {
        self.frames
            .lock()
            .iter()
            .filter_map(|f| match f {
                OutboundFrame::Binary(bytes) => Some(bytes.clone()),
                OutboundFrame::Text(_) => None,
            })
            .collect()
    }

    pub fn binary_count(&self) -> usize {
        self.frames
            .lock()
            .iter()
            .filter(|f| matches!(f, OutboundFrame::Binary(_)))
            .count()
    }

    /// Wait until at least `n` text frames arrived
    pub async fn wait_for_texts(&self, n: usize) -> Vec<String> {
        for _ in 0..200 {
            let texts = self.texts();
            if texts.len() >= n {
                return texts;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {} text frames, got {:?}", n, self.texts());
    }
}

#[async_trait]
impl Connection for FakeConnection {
    async fn send(&self, frame: OutboundFrame) -> Result<(), ConnectionError> {
        self.frames.lock().push(frame);
        Ok(())
    }

    async fn close(&self) {}
}

/// Collaborators plus handles for inspecting them
pub struct TestCollaborators {
    pub content: Arc<FakeContentRepository>,
    pub typing: Arc<RecordingTypingRelay>,
}

impl TestCollaborators {
    pub fn new() -> Self {
        Self {
            content: Arc::new(FakeContentRepository::default()),
            typing: Arc::new(RecordingTypingRelay::default()),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            content: self.content.clone(),
            tokens: Arc::new(StaticTokenValidator),
            typing: self.typing.clone(),
        }
    }
}

/// Settings for tests: defaults with a per-test pool name
pub fn test_settings() -> Settings {
    let mut settings = Settings::defaults().expect("default settings are valid");
    settings.buffer_pool.name = format!("test-{}", Uuid::new_v4());
    settings
}

/// Test application: state plus an HTTP test server over the full router
pub struct TestApp {
    pub state: AppState,
    pub fakes: TestCollaborators,
    pub server: TestServer,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(false)
    }

    /// Server with a real HTTP transport, needed for WebSocket upgrades
    pub fn with_http_transport() -> Self {
        Self::build(true)
    }

    fn build(http_transport: bool) -> Self {
        let fakes = TestCollaborators::new();
        let state = AppState::new(test_settings(), fakes.collaborators());
        let app = create_app(state.clone());

        let server = if http_transport {
            TestServer::builder()
                .http_transport()
                .build(app)
                .expect("test server starts")
        } else {
            TestServer::new(app).expect("test server starts")
        };

        Self {
            state,
            fakes,
            server,
        }
    }
}
