use rand::seq::SliceRandom;
use rand::Rng;

const PROPHECIES: &[&str] = &[
    "The commit you forgot will return to main at the next lunar merge.",
    "On the seventh build the bug will vanish, or come back as a segfault.",
    "Every 404 is a door to another dimension.",
    "If you must push --force, do it with grace.",
    "The terminal knows your secret, and your aliases.",
    "Your code compiles. At what cost?",
    "Every merge conflict is a karmic quarrel.",
    "The linter never sleeps.",
    "Friday evening's commit will reappear on Monday morning, changed.",
    "git blame reveals truths that burn.",
    "Nobody has ever read the README, except infinity.",
    "The backlog laughs at every estimate.",
    "Ctrl+Z is a retroactive prayer.",
    "Your cron job has a will of its own.",
    "The flaky test foretells an uncertain future. Rerun it until revelation.",
    "The build passes when you look at it with love.",
    "The CI pipeline is testing you, not your code.",
    "Every closed ticket opens another loop.",
    "A unit test is a well structured prayer.",
    "It is not prod that crashed, it is reality.",
];

/// Answers with a random prophecy. No ETA is ever given.
pub fn consult<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    PROPHECIES.choose(rng).copied().unwrap_or("The oracle is silent.")
}
