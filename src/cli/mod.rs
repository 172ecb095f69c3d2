pub mod commands;

use std::io::{self, Write};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::chat::{ChatMessage, Role, MAX_MESSAGES};
use crate::cli::commands::{Commands, SessionAction};
use crate::client::ChatClient;
use crate::config::AppConfig;
use crate::db::get_connection;
use crate::db::service::{DbService, DEFAULT_SESSION_TITLE};

pub async fn run_cli(command: Commands, config_path: String) {
    let config = AppConfig::load(&config_path).expect("Failed to load config");

    match command {
        Commands::Serve => {
            panic!("Serve command should be intercepted by main.rs to boot actix-web");
        }
        Commands::Session { action } => {
            let pool = get_connection(&config.database).expect("DB error");
            let conn = pool.lock().unwrap();

            match action {
                SessionAction::Create { title } => {
                    let title = title.as_deref().unwrap_or(DEFAULT_SESSION_TITLE);
                    match DbService::insert_session(&conn, title) {
                        Ok(session) => {
                            println!("Created Session: {} ({})", session.title, session.id)
                        }
                        Err(e) => eprintln!("Error: {}", e),
                    }
                }
                SessionAction::List => match DbService::list_sessions(&conn, 50, 0) {
                    Ok(sessions) => {
                        if sessions.is_empty() {
                            println!("No sessions found.");
                        } else {
                            println!("{:<38} | {:<20} | {}", "ID", "Created At", "Title");
                            println!("{:-<38}-+-{:-<20}-+-{:-<20}", "", "", "");
                            for s in sessions {
                                println!("{:<38} | {:<20} | {}", s.id.to_string(), s.created_at, s.title);
                            }
                        }
                    }
                    Err(e) => eprintln!("Error: {}", e),
                },
                SessionAction::Delete { id } => match DbService::delete_session(&conn, id) {
                    Ok(_) => println!("Deleted session {}", id),
                    Err(e) => eprintln!("Error: {}", e),
                },
            }
        }
        Commands::Chat { session, url } => {
            run_repl(session, url, config).await;
        }
    }
}

async fn run_repl(session_id: Uuid, url_override: Option<String>, config: AppConfig) {
    let pool = get_connection(&config.database).expect("DB Error");

    let session_exists = {
        let conn = pool.lock().unwrap();
        DbService::get_session(&conn, session_id)
            .unwrap_or(None)
            .is_some()
    };

    if !session_exists {
        eprintln!("Session {} not found.", session_id);
        return;
    }

    let base_url = url_override
        .unwrap_or_else(|| format!("http://{}:{}", config.server.host, config.server.port));
    let api_key = config.auth.api_keys.first().cloned().unwrap_or_default();
    let client = ChatClient::new(base_url, api_key);

    println!("--- StudyBuddy Terminal Chat ---");
    println!("Connected to Session: {}", session_id);
    println!("Type /exit to quit.");
    println!("--------------------------------");

    loop {
        print!("\nYou> ");
        io::stdout().flush().unwrap();

        let mut input = String::new();
        io::stdin().read_line(&mut input).unwrap();
        let text = input.trim();

        if text.is_empty() {
            continue;
        }
        if text == "/exit" || text == "/quit" {
            break;
        }

        // Save user message
        {
            let conn = pool.lock().unwrap();
            if let Err(e) = DbService::insert_message(&conn, session_id, "user", text) {
                eprintln!("Failed to save message: {}", e);
                continue;
            }
        }

        // Fetch history and keep the most recent window the relay will accept
        let history = {
            let conn = pool.lock().unwrap();
            DbService::get_messages(&conn, session_id, 10_000, 0).unwrap_or_default()
        };

        let mut messages: Vec<ChatMessage> = history
            .into_iter()
            .filter_map(|m| {
                Role::parse(&m.role).map(|role| ChatMessage {
                    role,
                    content: m.content,
                })
            })
            .collect();
        if messages.len() > MAX_MESSAGES {
            messages.drain(..messages.len() - MAX_MESSAGES);
        }

        let (tx, mut rx) = mpsc::channel::<String>(100);
        let client_clone = client.clone();

        print!("StudyBuddy> ");
        io::stdout().flush().unwrap();

        let handle =
            tokio::spawn(async move { client_clone.stream_chat(&messages, tx).await });

        while let Some(delta) = rx.recv().await {
            print!("{}", delta);
            io::stdout().flush().unwrap();
        }
        println!();

        match handle.await {
            Ok(Ok(assistant_content)) => {
                let conn = pool.lock().unwrap();
                let _ = DbService::insert_message(
                    &conn,
                    session_id,
                    "assistant",
                    &assistant_content,
                );
            }
            // Partial output is discarded; a truncated reply saved as complete
            // would be misleading.
            Ok(Err(e)) => eprintln!("\nError: {}", e),
            Err(e) => eprintln!("\nError: {}", e),
        }
    }
}
