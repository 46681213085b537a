//! Key event handling

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use crate::audio::Interaction;
use crate::model::ActivePane;
use super::queue::EntryEdit;
use super::AppController;

impl AppController {
    pub async fn handle_key_event(&self, key: KeyEvent) -> Result<()> {
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }

        // Any key press unlocks audio output
        self.trigger.note_interaction(Interaction::KeyPress);

        let model = &self.model;

        // Handle error message first (blocks all other interactions)
        if model.has_error().await {
            return match key.code {
                KeyCode::Esc | KeyCode::Enter => {
                    model.clear_error().await;
                    Ok(())
                }
                _ => Ok(()),
            };
        }

        // Handle help popup
        if model.is_help_popup_open().await {
            return match key.code {
                KeyCode::Esc | KeyCode::Char('h') | KeyCode::Char('H') => {
                    model.hide_help_popup().await;
                    Ok(())
                }
                _ => Ok(()),
            };
        }

        let ui_state = model.get_ui_state().await;

        // Queue pane editing
        if ui_state.active_pane == ActivePane::Queue {
            let edit = match key.code {
                KeyCode::Char('d') | KeyCode::Delete => Some(EntryEdit::Remove),
                // Move the selected track up / down
                KeyCode::Char('K') | KeyCode::Char('k') => Some(EntryEdit::MoveUp),
                KeyCode::Char('J') | KeyCode::Char('j') => Some(EntryEdit::MoveDown),
                KeyCode::Enter => Some(EntryEdit::Play),
                _ => None,
            };
            if let Some(edit) = edit {
                if let Some(entry) = model.selected_queue_entry().await {
                    self.spawn_queue_task(move |c| async move { c.edit_entry(entry, edit).await });
                }
                return Ok(());
            }
        }

        // Global keybindings
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                model.set_should_quit(true).await;
            }
            KeyCode::Tab => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    model.cycle_pane_backward().await;
                } else {
                    model.cycle_pane_forward().await;
                }
            }
            KeyCode::BackTab => {
                model.cycle_pane_backward().await;
            }
            KeyCode::Up => {
                model.move_selection_up().await;
            }
            KeyCode::Down => {
                model.move_selection_down().await;
            }
            KeyCode::Enter => match ui_state.active_pane {
                ActivePane::Queue => {}
                ActivePane::Library => {
                    if let Some(track) = model.selected_library_track().await {
                        self.spawn_queue_task(move |c| async move { c.append_track(track).await });
                    }
                }
                ActivePane::Suggestions => {
                    if let Some(track) = model.selected_suggestion().await {
                        self.spawn_queue_task(move |c| async move { c.append_track(track).await });
                    }
                }
            },
            // Play/Pause toggle
            KeyCode::Char(' ') => {
                self.toggle_playback().await;
            }
            KeyCode::Char('c') | KeyCode::Char('C') => {
                self.spawn_queue_task(|c| async move { c.clear_queue().await });
            }
            KeyCode::Char('s') | KeyCode::Char('S') => {
                self.spawn_queue_task(|c| async move { c.toggle_shuffle().await });
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                self.spawn_queue_task(|c| async move { c.cycle_repeat().await });
            }
            // Enhancement controls
            KeyCode::Char('e') | KeyCode::Char('E') => {
                self.toggle_enhancement();
            }
            KeyCode::Char('p') | KeyCode::Char('P') => {
                self.cycle_preset();
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.increase_intensity();
            }
            KeyCode::Char('-') => {
                self.decrease_intensity();
            }
            // Next library page (spawn in background)
            KeyCode::Char('n') | KeyCode::Char('N') => {
                let controller = self.clone();
                tokio::spawn(async move {
                    controller.load_next_library_page().await;
                });
            }
            // Show help popup
            KeyCode::Char('h') | KeyCode::Char('H') => {
                model.show_help_popup().await;
            }
            _ => {}
        }
        Ok(())
    }

    /// Clicks unlock audio like a key press; the wheel moves the selection.
    pub async fn handle_mouse_event(&self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.trigger.note_interaction(Interaction::Click);
            }
            MouseEventKind::ScrollUp => {
                self.trigger.note_interaction(Interaction::Scroll);
                self.model.move_selection_up().await;
            }
            MouseEventKind::ScrollDown => {
                self.trigger.note_interaction(Interaction::Scroll);
                self.model.move_selection_down().await;
            }
            _ => {}
        }
    }

    pub fn handle_focus_gained(&self) {
        self.trigger.note_interaction(Interaction::Focus);
    }

    /// Queue commands wait on the backend, so they run off the input loop.
    /// The mutation gate keeps them in order and each resolves its target
    /// only once it holds the gate.
    fn spawn_queue_task<F, Fut>(&self, task: F)
    where
        F: FnOnce(AppController) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = bool> + Send + 'static,
    {
        let controller = self.clone();
        tokio::spawn(async move {
            task(controller).await;
        });
    }
}
