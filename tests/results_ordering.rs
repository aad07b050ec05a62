// tests/results_ordering.rs
use chrono::{Duration, TimeZone, Utc};
use iran_news_radar::results::sort_by_recency;
use iran_news_radar::{Article, CycleId, GroupFilter, ResultSet, SourceGroups, TimeBucket};

fn art(link: &str, date: &str, score: u32) -> Article {
    let mut a = Article::empty("Feed");
    a.link = link.into();
    a.pub_date = date.into();
    a.with_score(score)
}

fn set(articles: Vec<Article>) -> ResultSet {
    ResultSet {
        articles,
        success_count: 1,
        ..ResultSet::empty(CycleId(1))
    }
}

#[test]
fn recency_puts_unparsable_dates_last_and_keeps_ties_stable() {
    let s = set(vec![
        art("garbage", "yesterday-ish", 10),
        art("older", "Mon, 13 Oct 2025 10:00:00 +0000", 10),
        art("tie-a", "2025-10-14 08:00:00", 10),
        art("empty", "", 10),
        art("newest", "2025-10-14T11:00:00Z", 10),
        art("tie-b", "Tue, 14 Oct 2025 11:00:00 +0300", 10),
    ]);
    let order: Vec<_> = s.sorted_by_recency().iter().map(|a| a.link.as_str()).collect();
    assert_eq!(
        order,
        vec!["newest", "tie-a", "tie-b", "older", "garbage", "empty"]
    );
}

#[test]
fn relevance_is_descending_and_stable() {
    let s = set(vec![
        art("a", "", 10),
        art("b", "", 26),
        art("c", "", 10),
        art("d", "", 14),
    ]);
    let order: Vec<_> = s.sorted_by_relevance().iter().map(|a| a.link.as_str()).collect();
    assert_eq!(order, vec!["b", "d", "a", "c"]);
    // Stored order is untouched.
    assert_eq!(s.articles[0].link, "a");
}

#[test]
fn sorting_owned_articles_works_too() {
    let mut v = vec![
        art("x", "2025-10-01 00:00:00", 1),
        art("y", "2025-10-02 00:00:00", 1),
    ];
    sort_by_recency(&mut v);
    assert_eq!(v[0].link, "y");
}

#[test]
fn timeline_covers_every_article_once() {
    let now = Utc.with_ymd_and_hms(2025, 10, 14, 12, 0, 0).unwrap();
    let at = |d: Duration| (now - d).to_rfc3339();
    let s = set(vec![
        art("2h", &at(Duration::hours(2)), 10),
        art("30h", &at(Duration::hours(30)), 10),
        art("13h", &at(Duration::hours(13)), 10),
        art("5m", &at(Duration::minutes(5)), 10),
    ]);
    let sections = s.timeline(now);
    let buckets: Vec<_> = sections.iter().map(|s| s.bucket).collect();
    assert_eq!(
        buckets,
        vec![
            TimeBucket::PastHour,
            TimeBucket::Hours1To4,
            TimeBucket::Hours12To24,
            TimeBucket::Days1To3,
        ]
    );
    let total: usize = sections.iter().map(|s| s.articles.len()).sum();
    assert_eq!(total, 4);
    assert_eq!(sections[0].bucket.label(), "Last hour");
}

#[test]
fn group_filter_views_a_single_group() {
    let groups = SourceGroups::from_pairs([
        ("Walla news".to_string(), "Walla".to_string()),
        ("Walla flash".to_string(), "Walla".to_string()),
    ]);
    let mut a = art("1", "", 10);
    a.source = "Walla news".into();
    let mut b = art("2", "", 10);
    b.source = "Globes".into();
    let mut c = art("3", "", 10);
    c.source = "Walla flash".into();
    let s = set(vec![a, b, c]);

    assert_eq!(s.groups(&groups), vec!["Globes".to_string(), "Walla".to_string()]);
    let walla: Vec<_> = s
        .view(&groups, &GroupFilter::Only("Walla".into()))
        .iter()
        .map(|a| a.link.as_str())
        .collect();
    assert_eq!(walla, vec!["1", "3"]);

    let filter = GroupFilter::Only("Ynet".into()).retain_valid(&s.groups(&groups));
    assert_eq!(filter, GroupFilter::All);
}
