//! Background editor that keeps the mock API changing.
//!
//! The `PostEditor` runs a thread that, on every tick, picks a random post and
//! replaces the first line of its body with a phrase from a fixed bank. Clients
//! syncing against the server therefore see updated records, and conflicts
//! whenever they edited the same quote locally.
//!
//! The thread exits when the returned stop sender is used or dropped.

use crate::model::post_board::PostBoard;
use crossbeam_channel::{Sender, select, tick, unbounded};
use log::{debug, error, info};
use quote_common::model::now_millis;
use rand::Rng;
use rand::seq::IndexedRandom;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const PHRASES: &[&str] = &[
    "What we plant in patience we harvest in peace.",
    "A quiet mind hears the loudest truths.",
    "Small steps still leave footprints.",
    "The lighthouse does not chase the ships.",
    "Rest is part of the work, not a break from it.",
    "Every map was drawn by someone who got lost.",
];

/// Background post editor.
pub struct PostEditor;

impl PostEditor {
    /// Start the editor thread and return a channel that stops it.
    pub fn start(board: Arc<Mutex<PostBoard>>, interval: Duration) -> Sender<()> {
        let (stop_tx, stop_rx) = unbounded::<()>();

        thread::spawn(move || {
            let ticker = tick(interval);
            info!("Post editor started (interval: {:?})", interval);
            loop {
                select! {
                    recv(stop_rx) -> _ => break,
                    recv(ticker) -> _ => {
                        if let Err(e) = Self::edit_random(&board) {
                            error!("Post editor failed: {}", e);
                            break;
                        }
                    }
                }
            }
            info!("Post editor stopping...");
        });
        stop_tx
    }

    fn edit_random(board: &Mutex<PostBoard>) -> quote_common::Result<()> {
        let mut rng = rand::rng();
        let mut board = board.lock()?;
        let ids = board.ids();
        let Some(&id) = ids.choose(&mut rng) else {
            return Ok(());
        };
        let phrase = PHRASES[rng.random_range(0..PHRASES.len())];
        if board.revise(id, phrase, now_millis()) {
            debug!("Revised post {}: {}", id, phrase);
        }
        Ok(())
    }
}
