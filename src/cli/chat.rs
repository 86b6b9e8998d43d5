use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use uuid::Uuid;

use crate::api::init_tracing;
use crate::assist::{TurnRequest, collaborators, run_turn};
use crate::core::AppConfig;
use crate::core::db::{async_db, initialize_db};

pub async fn run(
    user_id: &str,
    timezone: &str,
    conversation_id: Option<String>,
    config: AppConfig,
) -> Result<()> {
    init_tracing();
    let mut rl = DefaultEditor::new()?;

    let db = async_db(&config.db_path).await?;
    db.call(|conn| {
        initialize_db(conn)?;
        Ok(())
    })
    .await?;
    let collaborators = collaborators(&db, &config);
    let conversation_id = conversation_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    println!("Conversation {}", conversation_id);

    loop {
        let readline = rl.readline(">>> ");
        match readline {
            Ok(line) => {
                let request = TurnRequest {
                    conversation_id: conversation_id.clone(),
                    user_id: user_id.to_string(),
                    timezone: timezone.to_string(),
                    message: line,
                    current_time: None,
                };
                // A failed turn leaves the conversation as it was so
                // the user can try again
                match run_turn(&db, &collaborators, &request).await {
                    Ok(state) => {
                        if let Some(content) = state.messages.last().and_then(|m| m.content.as_ref())
                        {
                            println!("{}", content);
                        }
                    }
                    Err(err) => println!("Error: {}", err),
                }
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}
