pub mod modules {
    pub mod attendance_sync {
        pub mod core {
            pub mod attendance;
            pub mod board_columns;
            pub mod fingerprint;
            pub mod identity;
            pub mod ports;
            pub mod projection;
        }
        pub mod use_cases {
            pub mod project_record {
                pub mod project;
            }
            pub mod reconcile_record {
                pub mod decide;
                pub mod decision;
                pub mod handler;
            }
            pub mod run_batch {
                pub mod handler;
                pub mod report;
                pub mod window;
            }
        }
        pub mod adapters {
            pub mod outbound {
                pub mod in_memory_attendance_source;
                pub mod in_memory_board;
                pub mod in_memory_identity_store;
                pub mod json_file_identity_store;
                pub mod monday;
                pub mod personio;
            }
        }
    }
}

pub mod shell;
