use once_cell::sync::Lazy;
use regex::Regex;

/// Risk signatures that gate a command behind explicit confirmation. The
/// policy is deliberately conservative: a benign command that matches is an
/// acceptable false positive, a destructive command that slips through is
/// not. Extend by adding a source line; call sites never change.
const DESTRUCTIVE_SIGNATURES: &[&str] = &[
    // recursive/forced file removal
    r"\brm\b.*-[rf]",
    r"\brm\b.*/",
    // raw block-device and low-level writes
    r"\bdd\b",
    r"\bmkfs\b",
    r"\bformat\b",
    r"\bfdisk\b",
    r"\bparted\b",
    r"\bcryptsetup\b.*luksformat",
    // truncation, shredding, device redirects
    r":>\s*/",
    r"\bshred\b",
    r"\bwipefs\b",
    r">\s*/dev/",
    r"\btruncate\b",
    // permissions and ownership
    r"\bchmod\b.*777",
    r"\bchown\b",
    // forceful process termination
    r"\bkill\b.*-9",
    r"\bkillall\b",
    r"\bpkill\b",
    // service lifecycle
    r"\bsystemctl\b.*(stop|disable|mask|restart)",
    r"\bservice\b.*(stop|disable|restart)",
    // package removal
    r"\bapt-get\b.*(remove|purge|autoremove)",
    r"\bapt\b.*(remove|purge|autoremove)",
    r"\byum\b.*(remove|erase)",
    r"\bdnf\b.*(remove|erase)",
    r"\bpacman\b.*-R",
    r"\bsnap\b.*remove",
    // containers and images
    r"\bdocker\b.*(rm|rmi|system prune)",
    // firewall
    r"\biptables\b.*-F",
    r"\bufw\b.*disable",
    // power state
    r"\binit\b.*0",
    r"\bshutdown\b",
    r"\breboot\b",
    r"\bhalt\b",
    r"\bpoweroff\b",
    // users and groups
    r"\buserdel\b",
    r"\busermod\b",
    r"\bgroupdel\b",
    // destructive moves
    r"\bmv\b.*/",
    // scheduled-job wipes
    r"\bcrontab\b.*-r",
];

static DESTRUCTIVE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    DESTRUCTIVE_SIGNATURES
        .iter()
        .map(|source| {
            Regex::new(&format!("(?i){}", source)).expect("destructive signature regex")
        })
        .collect()
});

/// Classifies a command as destructive. Matching is case-insensitive over the
/// trimmed text; any single signature match settles the result.
pub fn is_destructive(command: &str) -> bool {
    let trimmed = command.trim();
    DESTRUCTIVE_PATTERNS.iter().any(|re| re.is_match(trimmed))
}

/// The warning returned in place of execution when a destructive command
/// arrives without confirmation. Lists the generic risk categories rather
/// than the matched signature, and tells the caller how to resubmit.
pub fn refusal_warning(command: &str) -> String {
    let mut warning = String::from("WARNING: destructive command detected\n\n");
    warning.push_str(&format!("Command: {}\n\n", command));
    warning.push_str("This command could:\n");
    warning.push_str("- delete files or directories\n");
    warning.push_str("- modify system configuration\n");
    warning.push_str("- stop or restart services\n");
    warning.push_str("- reboot or shut down the system\n");
    warning.push_str("- remove packages or users\n");
    warning.push_str("- change permissions or ownership\n\n");
    warning.push_str("CONFIRMATION REQUIRED\n\n");
    warning.push_str("To execute this command, resubmit it with 'confirmed: true'.\n");
    warning.push_str("Review the command carefully before confirming.");
    warning
}
