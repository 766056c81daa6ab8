pub mod audio_player;
pub mod help_overlay;
pub mod log_panel;
pub mod podcast_list;
pub mod script_pane;
pub mod voice_list;
