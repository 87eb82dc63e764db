//! PII masking for log call-sites.
//!
//! Audit payloads routinely contain emails, phone numbers, and account
//! identifiers; anything that reaches operational logs goes through these
//! helpers first.

/// Kind of personally identifiable value being masked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PiiKind {
    Email,
    Phone,
    Ssn,
    Account,
    Name,
}

/// Mask a PII value for logging. Unknown-empty input masks to empty.
pub fn mask_pii(value: &str, kind: PiiKind) -> String {
    if value.is_empty() {
        return String::new();
    }
    match kind {
        PiiKind::Email => mask_email(value),
        PiiKind::Phone => mask_phone(value),
        PiiKind::Ssn => mask_ssn(value),
        PiiKind::Account => mask_account(value),
        PiiKind::Name => mask_name(value),
    }
}

fn mask_email(email: &str) -> String {
    let Some(at) = email.find('@') else {
        return "***".into();
    };
    if at == 0 || email.len() < 3 {
        return "***".into();
    }
    let first = &email[..email.char_indices().nth(1).map_or(1, |(i, _)| i)];
    format!("{first}***{}", &email[at..])
}

fn mask_phone(phone: &str) -> String {
    if phone.len() < 4 {
        return "****".into();
    }
    format!("{}***{}", &phone[..2], &phone[phone.len() - 4..])
}

fn mask_ssn(ssn: &str) -> String {
    if ssn.len() < 4 {
        return "***".into();
    }
    format!("***-**-{}", &ssn[ssn.len() - 4..])
}

fn mask_account(account: &str) -> String {
    if account.len() < 4 {
        return "****".into();
    }
    format!("****{}", &account[account.len() - 4..])
}

fn mask_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if chars.next().is_some() => format!("{first}***"),
        _ => "***".into(),
    }
}
