//! Render a standing as a chat post.

use std::fmt::Write;

use crate::chat::{Post, PostField};
use crate::emoji::EmojiSet;
use crate::model::{ActivityKind, Measure, Standing};

/// Build the three-column leaderboard post, or `None` for an empty
/// standing.
pub fn render(standing: &Standing, emojis: &EmojiSet) -> Option<Post> {
    if standing.is_empty() {
        return None;
    }
    let numbered = standing.rows.len() > 1;

    let mut users = String::new();
    let mut values = String::new();
    let mut ranks = String::new();
    for row in &standing.rows {
        users.push('\n');
        if numbered {
            let _ = write!(users, " {} -", row.local_rank);
        }
        let _ = write!(users, " {}", row.member.display_name);
        if let Some(tag) = emojis.get(row.member.account_type.as_str()) {
            let _ = write!(users, " {tag}");
        }
        if let Some(id) = &row.member.chat_user_id {
            let _ = write!(users, " <@{id}>");
        }

        let value = match row.measure {
            Measure::Skill { level, .. } => level,
            Measure::Score { score } => score,
        };
        let _ = write!(values, "\n{value}");

        if row.is_ranked() {
            let _ = write!(ranks, "\n{}", row.official_rank);
        } else {
            ranks.push_str("\n-");
        }
    }

    let title = match emojis.for_activity(&standing.activity) {
        Some(tag) => format!("{tag} {}", standing.activity),
        None => standing.activity.clone(),
    };
    let quantity = match standing.kind {
        ActivityKind::Skill => "Level",
        ActivityKind::Activity => "Score",
    };

    Some(Post {
        title,
        fields: vec![
            field("Username", users),
            field(quantity, values),
            field("Rank", ranks),
        ],
    })
}

fn field(name: &str, value: String) -> PostField {
    PostField {
        name: name.to_string(),
        value,
        inline: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Member, StandingRow};
    use osrs_hiscores::AccountType;

    fn row(name: &str, rank: i64, local: u32, kind: AccountType) -> StandingRow {
        StandingRow {
            member: Member::new("g1", name, kind),
            official_rank: rank,
            local_rank: local,
            measure: Measure::Score { score: 100 + local as i64 },
        }
    }

    #[test]
    fn empty_standing_renders_nothing() {
        let standing = Standing {
            activity: "Zulrah".into(),
            kind: ActivityKind::Activity,
            rows: vec![],
        };
        assert!(render(&standing, &EmojiSet::new()).is_none());
    }

    #[test]
    fn multi_row_post_is_numbered_and_decorated() {
        let mut emojis = EmojiSet::new();
        emojis.insert("zulrah", "<:zulrah:1>");
        emojis.insert("ironman", "<:ironman:2>");
        let mut first = row("Zezima", 40, 1, AccountType::Ironman);
        first.member.chat_user_id = Some("777".into());
        let standing = Standing {
            activity: "Zulrah".into(),
            kind: ActivityKind::Activity,
            rows: vec![first, row("Lynx Titan", -1, 2, AccountType::Main)],
        };

        let post = render(&standing, &emojis).unwrap();
        assert_eq!(post.title, "<:zulrah:1> Zulrah");
        assert_eq!(post.fields[0].value, "\n 1 - Zezima <:ironman:2> <@777>\n 2 - Lynx Titan");
        assert_eq!(post.fields[1].name, "Score");
        assert_eq!(post.fields[1].value, "\n101\n102");
        assert_eq!(post.fields[2].value, "\n40\n-");
        assert!(post.fields.iter().all(|f| f.inline));
    }

    #[test]
    fn single_row_is_not_numbered() {
        let standing = Standing {
            activity: "Woodcutting".into(),
            kind: ActivityKind::Skill,
            rows: vec![StandingRow {
                measure: Measure::Skill {
                    level: 99,
                    experience: 13_034_431,
                },
                ..row("Zezima", 3, 1, AccountType::Main)
            }],
        };
        let post = render(&standing, &EmojiSet::new()).unwrap();
        assert_eq!(post.title, "Woodcutting");
        assert_eq!(post.fields[0].value, "\n Zezima");
        assert_eq!(post.fields[1].name, "Level");
        assert_eq!(post.fields[1].value, "\n99");
    }
}
