//! Persistence collaborators for ClawLoop: todo snapshot stores and session
//! summary sinks.

pub mod file_todo;
pub mod in_memory;
pub mod summary;

pub use file_todo::FileTodoStore;
pub use in_memory::InMemoryTodoStore;
pub use summary::{FileSummarySink, NoopSummarySink};

use clawloop_core::todo::SessionId;

/// File-name form of a session id: one path component, distinct per id.
///
/// Percent-encoding is reversible, so `a.b`, `a/b` and `a_b` stay apart.
/// Ids made only of dots get every dot encoded.
pub fn session_file_name(session: &SessionId) -> String {
    let raw = session.as_str();
    if raw.chars().all(|c| c == '.') {
        return raw.replace('.', "%2E");
    }
    urlencoding::encode(raw).into_owned()
}

/// Inverse of [`session_file_name`]; `None` for names it never produces.
pub fn session_from_file_name(name: &str) -> Option<SessionId> {
    urlencoding::decode(name)
        .ok()
        .map(|decoded| SessionId::from(decoded.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_ids_get_distinct_names() {
        let names: Vec<String> = ["a.b", "a/b", "a_b", "a%2Fb"]
            .iter()
            .map(|s| session_file_name(&SessionId::from(s)))
            .collect();
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(names.iter().all(|n| !n.contains('/')));

        for raw in ["a.b", "a/b", "..", "x%y"] {
            let name = session_file_name(&SessionId::from(raw));
            assert_eq!(session_from_file_name(&name).unwrap().as_str(), raw);
        }
    }

    #[test]
    fn plain_ids_are_unchanged() {
        assert_eq!(session_file_name(&SessionId::from("s")), "s");
        assert_eq!(session_file_name(&SessionId::from("root-sub1-0")), "root-sub1-0");
    }

    #[test]
    fn dot_ids_cannot_escape_the_root() {
        assert_eq!(session_file_name(&SessionId::from("..")), "%2E%2E");
        assert_eq!(session_file_name(&SessionId::from(".")), "%2E");
        assert_eq!(session_file_name(&SessionId::from("")), "");
    }
}
