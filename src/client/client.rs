//! Terminal quiz client: wires the hub session, the quiz state and the UI.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::error::QuizError;
use crate::terminal::{self, AppTerminal};

use super::app::ClientApp;
use super::session::{ConnectionState, SessionClient};
use super::state::{Effect, QuizEvent};
use super::ui;

/// Messages funneled into the UI loop, in the order they happened.
enum AppEvent {
    Quiz(QuizEvent),
    Notice(String),
}

/// Run the quiz client until the user quits.
pub async fn run(config: ClientConfig) -> Result<(), QuizError> {
    info!(url = %config.hub_url, player = %config.player, "starting quiz client");

    let client = Arc::new(SessionClient::connect(config.clone()).await?);
    info!(session = %client.session_id(), "session established");
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let question_tx = event_tx.clone();
    client.on_new_question(move |question| {
        let _ = question_tx.send(AppEvent::Quiz(question.into()));
    });
    let result_tx = event_tx.clone();
    client.on_receive_result(move |result| {
        let _ = result_tx.send(AppEvent::Quiz(result.into()));
    });

    let mut app = ClientApp::new(&config);
    let state_rx = client.state_changes();

    let mut term = match terminal::init() {
        Ok(term) => term,
        Err(e) => return shut_down(&client, Err(e.into()), Ok(())).await,
    };
    let result = run_tui(&mut term, &mut app, &client, event_tx, event_rx, state_rx).await;
    let restored = terminal::restore();

    info!(score = app.quiz.score(), answered = app.quiz.records().len(), "quiz client stopped");
    shut_down(&client, result, restored).await
}

/// Disconnect, then report the UI error first and the restore error second.
async fn shut_down(
    client: &SessionClient,
    result: Result<(), QuizError>,
    restored: io::Result<()>,
) -> Result<(), QuizError> {
    client.disconnect().await;
    result?;
    restored?;
    Ok(())
}

async fn run_tui(
    term: &mut AppTerminal,
    app: &mut ClientApp,
    client: &Arc<SessionClient>,
    event_tx: mpsc::UnboundedSender<AppEvent>,
    mut event_rx: mpsc::UnboundedReceiver<AppEvent>,
    state_rx: watch::Receiver<ConnectionState>,
) -> Result<(), QuizError> {
    loop {
        while let Ok(event) = event_rx.try_recv() {
            let effects = handle_event(app, event);
            perform(effects, client, &event_tx);
        }

        app.set_connection(*state_rx.borrow());
        if app.should_quit {
            break;
        }

        term.draw(|frame| ui::render(frame, app))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                let effects = handle_input(app, key);
                perform(effects, client, &event_tx);
            }
        }
    }

    Ok(())
}

fn handle_event(app: &mut ClientApp, event: AppEvent) -> Vec<Effect> {
    match event {
        AppEvent::Quiz(event) => app.apply(event),
        AppEvent::Notice(notice) => {
            app.set_notice(notice);
            Vec::new()
        }
    }
}

/// Translate a key press into quiz events.
fn handle_input(app: &mut ClientApp, key: KeyEvent) -> Vec<Effect> {
    match key.code {
        KeyCode::Esc => {
            app.should_quit = true;
            Vec::new()
        }
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
            Vec::new()
        }
        KeyCode::Up => {
            app.select_previous();
            Vec::new()
        }
        KeyCode::Down => {
            app.select_next();
            Vec::new()
        }
        KeyCode::Enter => app.submit(),
        KeyCode::Backspace => app.apply(QuizEvent::InputBackspace),
        KeyCode::Char(c) => app.apply(QuizEvent::InputChar(c)),
        _ => Vec::new(),
    }
}

/// Carry out effects without blocking the UI; outcomes come back as events.
fn perform(
    effects: Vec<Effect>,
    client: &Arc<SessionClient>,
    event_tx: &mpsc::UnboundedSender<AppEvent>,
) {
    for effect in effects {
        match effect {
            Effect::SubmitRequested { index, submission } => {
                let client = Arc::clone(client);
                let event_tx = event_tx.clone();
                tokio::spawn(async move {
                    let outcome = client
                        .submit_answer(
                            &submission.player,
                            submission.correct_answer,
                            submission.user_answer,
                            submission.is_correct,
                        )
                        .await;

                    let event = match outcome {
                        Ok(()) => QuizEvent::SubmitAcknowledged { index },
                        Err(e) => {
                            warn!(index, error = %e, "answer was not delivered");
                            let notice = if e.is_transport() {
                                format!("Answer not sent: {}", e)
                            } else {
                                format!("Hub rejected answer: {}", e)
                            };
                            let _ = event_tx.send(AppEvent::Notice(notice));
                            QuizEvent::SubmitFailed { index }
                        }
                    };
                    let _ = event_tx.send(AppEvent::Quiz(event));
                });
            }
        }
    }
}
