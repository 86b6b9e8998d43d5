pub mod find_meeting_time;
