//! Local stand-in for the Supabase REST API, for handler tests

use std::sync::{Arc, Mutex};

use axum::{
    extract::Request,
    http::{Method, StatusCode},
    response::{IntoResponse, Json},
    Router,
};
use serde_json::Value;
use tokio::net::TcpListener;

use crate::config::{test_config, Config};

type Responder = dyn Fn(&Method, &str) -> (StatusCode, Value) + Send + Sync;

/// Serves canned answers keyed on method and path, recording every call
pub(crate) struct MockBackend {
    pub url: String,
    calls: Arc<Mutex<Vec<(Method, String)>>>,
}

impl MockBackend {
    pub async fn start<F>(respond: F) -> Self
    where
        F: Fn(&Method, &str) -> (StatusCode, Value) + Send + Sync + 'static,
    {
        let calls: Arc<Mutex<Vec<(Method, String)>>> = Arc::default();
        let respond: Arc<Responder> = Arc::new(respond);

        let recorded = calls.clone();
        let app = Router::new().fallback(move |request: Request| {
            let recorded = recorded.clone();
            let respond = respond.clone();
            async move {
                let method = request.method().clone();
                let path = request.uri().path().to_string();
                recorded.lock().unwrap().push((method.clone(), path.clone()));
                let (status, body) = respond(&method, &path);
                (status, Json(body)).into_response()
            }
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            calls,
        }
    }

    /// Config pointing the Supabase client at this backend
    pub fn config(&self) -> Config {
        Config {
            supabase_url: self.url.clone(),
            ..test_config()
        }
    }

    /// How many calls matched `method` and `path`
    pub fn count(&self, method: Method, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, p)| *m == method && p == path)
            .count()
    }
}
