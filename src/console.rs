//! Line-oriented chat console talking to the `/ask` endpoint.

use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::core::errors::ApiError;

pub const API_URL_ENV: &str = "RAGCHAT_API_URL";
pub const DEFAULT_API_URL: &str = "http://localhost:8000/ask";

const BANNER: &str = "RAG Chatbot\nAsk a question about the story. Type /exit or press Ctrl-D to quit.";
const NO_ANSWER: &str = "No answer found.";

pub struct ChatConsole {
    client: Client,
    api_url: String,
}

impl ChatConsole {
    pub fn new(api_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(ApiError::internal)?;
        Ok(Self {
            client,
            api_url: api_url.into(),
        })
    }

    /// `RAGCHAT_API_URL`, or the local server's default address.
    pub fn from_env() -> Result<Self, ApiError> {
        let api_url = std::env::var(API_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self::new(api_url)
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Sends one question and renders whatever came back as display text.
    pub async fn ask(&self, question: &str) -> String {
        let response = match self
            .client
            .post(&self.api_url)
            .json(&json!({ "question": question }))
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return format!("Exception: {}", err),
        };

        let status = response.status();
        if status.as_u16() != 200 {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!("Endpoint answered {}", status);
            return format!("Error: {} - {}", status.as_u16(), body);
        }

        match response.json::<Value>().await {
            Ok(body) => body
                .get("answer")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| NO_ANSWER.to_string()),
            Err(err) => format!("Exception: {}", err),
        }
    }

    /// Reads questions line by line until EOF or `/exit`.
    pub async fn run<R, W>(&self, input: R, mut output: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        output.write_all(format!("{}\n\n", BANNER).as_bytes()).await?;

        let mut lines = input.lines();
        loop {
            output.write_all(b"You: ").await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                output.write_all(b"\n").await?;
                break;
            };
            let question = line.trim();
            if question.is_empty() {
                continue;
            }
            if question == "/exit" {
                break;
            }

            let reply = self.ask(question).await;
            output
                .write_all(format!("Bot: {}\n\n", reply).as_bytes())
                .await?;
        }

        output.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use tokio::net::TcpListener;

    async fn spawn_mock(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/ask", addr)
    }

    async fn echo(Json(body): Json<Value>) -> Json<Value> {
        Json(json!({ "answer": format!("You asked: {}", body["question"].as_str().unwrap_or("")) }))
    }

    #[tokio::test]
    async fn prints_answer_field() {
        let url = spawn_mock(Router::new().route("/ask", post(echo))).await;
        let console = ChatConsole::new(url).unwrap();

        assert_eq!(console.ask("Who is Kalyani?").await, "You asked: Who is Kalyani?");
    }

    #[tokio::test]
    async fn missing_answer_field_prints_placeholder() {
        let url = spawn_mock(Router::new().route("/ask", post(|| async { Json(json!({})) }))).await;
        let console = ChatConsole::new(url).unwrap();

        assert_eq!(console.ask("Anything?").await, NO_ANSWER);
    }

    #[tokio::test]
    async fn non_200_status_prints_status_and_body() {
        let url = spawn_mock(Router::new().route(
            "/ask",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        ))
        .await;
        let console = ChatConsole::new(url).unwrap();

        assert_eq!(console.ask("Anything?").await, "Error: 500 - boom");
    }

    #[tokio::test]
    async fn unreachable_endpoint_prints_exception() {
        let console = ChatConsole::new("http://127.0.0.1:9/ask").unwrap();
        assert!(console.ask("Anything?").await.starts_with("Exception: "));
    }

    #[tokio::test]
    async fn run_skips_blank_lines_and_stops_at_exit() {
        let url = spawn_mock(Router::new().route("/ask", post(echo))).await;
        let console = ChatConsole::new(url).unwrap();

        let input: &[u8] = b"first\n\n   \n/exit\nnever sent\n";
        let mut output = Vec::new();
        console.run(input, &mut output).await.unwrap();

        let printed = String::from_utf8(output).unwrap();
        assert!(printed.starts_with("RAG Chatbot"));
        assert_eq!(printed.matches("Bot: ").count(), 1);
        assert!(printed.contains("Bot: You asked: first"));
        assert!(!printed.contains("never sent"));
    }
}
