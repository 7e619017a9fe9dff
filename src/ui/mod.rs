pub mod components;
pub mod layout;
pub mod text_editor;
pub mod theme;
