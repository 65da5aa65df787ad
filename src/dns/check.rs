//! Response validation.

use crate::dns::config::ExpectedAnswer;
use crate::dns::exchange::ExchangeResult;
use crate::error::MismatchError;

/// Checks a decoded response against the configured expectations.
///
/// Answers are scanned in arrival order and the first mismatch wins; for
/// each answer the value expectation is checked before the type
/// expectation. An empty answer section passes every answer expectation.
/// The authoritative flag is a header property and is checked regardless
/// of the answer section.
pub fn check_response(
    response: &ExchangeResult,
    expect: &ExpectedAnswer,
) -> Result<(), MismatchError> {
    if expect.authoritative && !response.authoritative {
        return Err(MismatchError::NotAuthoritative);
    }

    for answer in &response.answers {
        if let Some(expected) = &expect.value {
            if *expected != answer.value {
                return Err(MismatchError::Value {
                    actual: answer.value.clone(),
                    expected: expected.clone(),
                });
            }
        }
        if let Some(expected) = expect.record_type {
            if expected != answer.record_type {
                return Err(MismatchError::Type {
                    actual: answer.record_type.to_string(),
                    expected: expected.to_string(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::answer::{DnsAnswer, RecordKind};

    fn response(authoritative: bool, answers: Vec<DnsAnswer>) -> ExchangeResult {
        ExchangeResult {
            server: "udp://127.0.0.1:53".to_string(),
            authoritative,
            code: "NoError".to_string(),
            answers,
            tls: None,
        }
    }

    fn answer(record_type: RecordKind, value: &str) -> DnsAnswer {
        DnsAnswer {
            name: "probe.example.com.".to_string(),
            record_type,
            value: value.to_string(),
            ttl: 300,
        }
    }

    fn expect_value(value: &str) -> ExpectedAnswer {
        ExpectedAnswer {
            value: Some(value.to_string()),
            ..ExpectedAnswer::default()
        }
    }

    fn expect_type(record_type: RecordKind) -> ExpectedAnswer {
        ExpectedAnswer {
            record_type: Some(record_type),
            ..ExpectedAnswer::default()
        }
    }

    #[test]
    fn matching_value_passes() {
        let response = response(false, vec![answer(RecordKind::A, "8.8.8.8")]);
        assert!(check_response(&response, &expect_value("8.8.8.8")).is_ok());
    }

    #[test]
    fn wrong_value_names_both_sides() {
        let response = response(false, vec![answer(RecordKind::A, "8.8.4.4")]);
        let mismatch = check_response(&response, &expect_value("8.8.8.8")).unwrap_err();
        assert_eq!(
            mismatch,
            MismatchError::Value {
                actual: "8.8.4.4".to_string(),
                expected: "8.8.8.8".to_string(),
            }
        );
    }

    #[test]
    fn matching_cname_value_passes() {
        let response = response(
            false,
            vec![answer(RecordKind::Cname, "alias.example.com.")],
        );
        assert!(check_response(&response, &expect_value("alias.example.com.")).is_ok());
    }

    #[test]
    fn wrong_type_names_both_sides() {
        let response = response(
            false,
            vec![answer(RecordKind::Cname, "alias.example.com.")],
        );
        let mismatch = check_response(&response, &expect_type(RecordKind::A)).unwrap_err();
        assert_eq!(
            mismatch,
            MismatchError::Type {
                actual: "cname".to_string(),
                expected: "a".to_string(),
            }
        );
    }

    #[test]
    fn matching_txt_value_passes() {
        let response = response(false, vec![answer(RecordKind::Txt, "sample text")]);
        assert!(check_response(&response, &expect_value("sample text")).is_ok());
    }

    #[test]
    fn matching_value_still_checks_the_type() {
        let expect = ExpectedAnswer {
            value: Some("alias.example.com.".to_string()),
            record_type: Some(RecordKind::A),
            authoritative: false,
        };
        let response = response(
            false,
            vec![answer(RecordKind::Cname, "alias.example.com.")],
        );
        let mismatch = check_response(&response, &expect).unwrap_err();
        assert!(matches!(mismatch, MismatchError::Type { .. }));
    }

    #[test]
    fn value_mismatch_wins_over_type_mismatch() {
        let expect = ExpectedAnswer {
            value: Some("8.8.8.8".to_string()),
            record_type: Some(RecordKind::A),
            authoritative: false,
        };
        let response = response(
            false,
            vec![answer(RecordKind::Cname, "alias.example.com.")],
        );
        let mismatch = check_response(&response, &expect).unwrap_err();
        assert!(matches!(mismatch, MismatchError::Value { .. }));
    }

    #[test]
    fn first_mismatch_in_arrival_order_wins() {
        let response = response(
            false,
            vec![
                answer(RecordKind::A, "8.8.8.8"),
                answer(RecordKind::A, "1.1.1.1"),
                answer(RecordKind::Cname, "alias.example.com."),
            ],
        );
        let mismatch = check_response(&response, &expect_value("8.8.8.8")).unwrap_err();
        assert_eq!(
            mismatch,
            MismatchError::Value {
                actual: "1.1.1.1".to_string(),
                expected: "8.8.8.8".to_string(),
            }
        );
    }

    #[test]
    fn empty_answers_pass_answer_expectations() {
        let empty = response(false, vec![]);
        assert!(check_response(&empty, &expect_value("8.8.8.8")).is_ok());
        assert!(check_response(&empty, &expect_type(RecordKind::A)).is_ok());
        let both = ExpectedAnswer {
            value: Some("8.8.8.8".to_string()),
            record_type: Some(RecordKind::A),
            authoritative: false,
        };
        assert!(check_response(&empty, &both).is_ok());
    }

    #[test]
    fn authoritative_flag_is_checked_even_without_answers() {
        let expect = ExpectedAnswer {
            authoritative: true,
            ..ExpectedAnswer::default()
        };
        let mismatch = check_response(&response(false, vec![]), &expect).unwrap_err();
        assert_eq!(mismatch, MismatchError::NotAuthoritative);
        assert!(check_response(&response(true, vec![]), &expect).is_ok());
    }

    #[test]
    fn no_expectations_accept_anything() {
        let response = response(false, vec![answer(RecordKind::A, "203.0.113.9")]);
        assert!(check_response(&response, &ExpectedAnswer::default()).is_ok());
    }
}
