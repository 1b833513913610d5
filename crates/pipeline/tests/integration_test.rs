//! Integration tests for the pipeline.
//!
//! Aggregation, scoring and ranking run together on a small fixture group.

use catalog::{Genre, Movie};
use chrono::{NaiveDate, Utc};
use domain::{GenrePreference, GroupId, Member};
use pipeline::{ScoringContext, ScoringPipeline, aggregate_preferences, rank};

const COMEDY: u32 = 35;
const DRAMA: u32 = 18;

fn movie(id: u32, title: &str, rating: f32, votes: u32, genres: &[(u32, &str)], year: i32) -> Movie {
    Movie {
        id,
        title: title.to_string(),
        overview: String::new(),
        poster_url: None,
        release_date: NaiveDate::from_ymd_opt(year, 1, 1),
        genres: genres.iter().map(|&(id, name)| Genre::new(id, name)).collect(),
        vote_average: rating,
        vote_count: votes,
        runtime: None,
    }
}

fn members() -> Vec<Member> {
    let now = Utc::now();
    vec![
        Member::new("ana", now).with_preferences(vec![GenrePreference::new(COMEDY, "Comedy", 5)]),
        Member::new("ben", now).with_preferences(vec![GenrePreference::new(COMEDY, "Comedy", 7)]),
        Member::new("cai", now).with_preferences(vec![GenrePreference::new(COMEDY, "Comedy", 9)]),
        Member::new("dee", now).with_preferences(vec![GenrePreference::new(DRAMA, "Drama", 10)]),
    ]
}

fn catalog_pages() -> Vec<Movie> {
    // Comedy page followed by drama page; movie 3 appears in both
    vec![
        movie(1, "Laugh Track", 7.0, 500, &[(COMEDY, "Comedy")], 2010),
        movie(2, "Big Jokes", 6.0, 3000, &[(COMEDY, "Comedy")], 2023),
        movie(3, "Sad Clown", 7.8, 1200, &[(COMEDY, "Comedy"), (DRAMA, "Drama")], 2015),
        movie(3, "Sad Clown", 7.8, 1200, &[(COMEDY, "Comedy"), (DRAMA, "Drama")], 2015),
        movie(4, "Quiet Tears", 8.1, 800, &[(DRAMA, "Drama")], 1998),
        movie(5, "Twin", 6.0, 3000, &[(COMEDY, "Comedy")], 2023),
    ]
}

#[test]
fn test_group_recommendation_flow() {
    let prefs = aggregate_preferences(GroupId::nil(), &members());
    assert_eq!(prefs.top_genres(5).len(), 2);

    let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let context = ScoringContext::new(&prefs, today);
    let pipeline = ScoringPipeline::default();

    let ranked = rank(pipeline.score_all(&catalog_pages(), &context), 10);

    // Duplicate removed
    assert_eq!(ranked.len(), 5);
    // Movie in both genres with a high rating leads
    assert_eq!(ranked[0].movie.id, 3);
    // Identical scores fall back to movie id
    let pos2 = ranked.iter().position(|s| s.movie.id == 2).unwrap();
    let pos5 = ranked.iter().position(|s| s.movie.id == 5).unwrap();
    assert_eq!(ranked[pos2].score, ranked[pos5].score);
    assert!(pos2 < pos5);

    for pair in ranked.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[test]
fn test_recommendations_are_deterministic() {
    let prefs = aggregate_preferences(GroupId::nil(), &members());
    let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let context = ScoringContext::new(&prefs, today);
    let pipeline = ScoringPipeline::default();

    let first = rank(pipeline.score_all(&catalog_pages(), &context), 3);
    let mut reversed = catalog_pages();
    reversed.reverse();
    let second = rank(pipeline.score_all(&reversed, &context), 3);

    assert_eq!(first, second);
}

#[test]
fn test_candidates_carry_snapshot_fields() {
    let prefs = aggregate_preferences(GroupId::nil(), &members());
    let context = ScoringContext::new(&prefs, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
    let ranked = rank(ScoringPipeline::default().score_all(&catalog_pages(), &context), 1);

    let candidate = ranked.into_iter().next().unwrap().into_candidate();
    assert_eq!(candidate.movie_id, 3);
    assert_eq!(candidate.year, Some(2015));
    assert_eq!(candidate.genres, vec!["Comedy", "Drama"]);
    assert_eq!(candidate.rating, 7.8);
    assert!(!candidate.reason.is_empty());
}
