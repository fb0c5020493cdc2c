use std::time::{Duration, Instant};

use crossterm::event::{Event, EventStream, KeyEventKind};
use futures::StreamExt;
use log::{debug, info, warn};
use tokio::{
    sync::mpsc::{self, UnboundedSender},
    time,
};

use crate::{
    api::ApiClient,
    config::Config,
    error::Result,
    push::{hub::HubClient, EventSource},
    view::{self, tui},
};

use super::{App, AppMessage, Effect};

const TICK: Duration = Duration::from_millis(250);

/// Hands effects to the runtime. Effects that a newer request may supersede
/// are registered with the store so it can abort them.
fn drive(app: &mut App, effects: Vec<Effect>, api: &ApiClient, tx: &UnboundedSender<AppMessage>) {
    for effect in effects {
        debug!("effect {:?}", effect);
        let superseding = effect.superseding();
        let handle = effect.spawn(api.clone(), tx.clone());
        if let Some((kind, ticket)) = superseding {
            app.track(kind, ticket, handle.abort_handle());
        }
    }
}

/// Interactive feed. Owns the terminal until the user quits.
pub async fn run(config: &Config) -> Result<()> {
    let api = ApiClient::new(config);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (push_tx, mut push_rx) = mpsc::unbounded_channel();
    let push = HubClient::new(config).spawn(push_tx);

    let mut app = App::new(config.user_id(), config.admin());
    let effects = app.start();
    drive(&mut app, effects, &api, &tx);

    let mut terminal = tui::setup_terminal()?;
    let mut events = EventStream::new();
    let mut ticker = time::interval(TICK);
    info!("Feed started against {}", config.api_url());

    let result = loop {
        if let Err(err) = terminal.draw(|f| view::render(f, &app)) {
            break Err(err.into());
        }

        let message = tokio::select! {
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => AppMessage::Key(key),
                Some(Ok(_)) => continue,
                Some(Err(err)) => break Err(err.into()),
                None => break Ok(()),
            },
            Some(message) = rx.recv() => message,
            Some(push) = push_rx.recv() => AppMessage::Push(push),
            _ = ticker.tick() => {
                app.tick(Instant::now());
                continue;
            }
        };

        let effects = app.update(message);
        drive(&mut app, effects, &api, &tx);
        if app.should_quit() {
            break Ok(());
        }
    };

    push.abort();
    if let Err(err) = tui::restore_terminal(&mut terminal) {
        warn!("Could not restore terminal: {}", err);
    }
    info!("Feed closed");
    result
}
