pub mod modal;
pub mod part_nav;
pub mod progress_bar;
pub mod question_list;
pub mod skill_header;
pub mod speaking_panel;
pub mod writing_panel;
