pub mod auth;
pub mod middleware;
pub mod rest;
pub mod state;

pub use middleware::require_auth;
pub use rest::{
    change_config_handler, create_school_handler, create_student_handler, dashboard_handler,
    delete_student_handler, list_students_handler, master_handler, query_students_handler,
    record_visit_handler, replace_master_handler, update_notes_handler, update_student_handler,
};
