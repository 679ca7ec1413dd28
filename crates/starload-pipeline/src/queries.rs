//! Transform queries for the star-schema load.
//!
//! These selects are the source of truth for the join and aggregation logic.
//! Each is wrapped in an `INSERT INTO <table> ...` by its load task. They are
//! idempotent only to the extent the select itself is; the fact loader in
//! particular adds no deduplication on top.

/// Fact rows: one per NextSong event, joined against the song catalog.
pub const SONGPLAY_TABLE_INSERT: &str = "
    SELECT
        md5(events.sessionid || events.start_time) AS playid,
        events.start_time,
        events.userid,
        events.level,
        songs.song_id AS songid,
        songs.artist_id AS artistid,
        events.sessionid,
        events.location,
        events.useragent
    FROM (
        SELECT TIMESTAMP 'epoch' + ts / 1000 * INTERVAL '1 second' AS start_time, *
        FROM staging_events
        WHERE page = 'NextSong'
    ) events
    LEFT JOIN staging_songs songs
        ON events.song = songs.title
        AND events.artist = songs.artist_name
        AND events.length = songs.duration
";

/// User dimension rows from the event stream.
pub const USER_TABLE_INSERT: &str = "
    SELECT DISTINCT userid, firstname, lastname, gender, level
    FROM staging_events
    WHERE page = 'NextSong'
";

/// Song dimension rows from the song catalog.
pub const SONG_TABLE_INSERT: &str = "
    SELECT DISTINCT song_id, title, artist_id, year, duration
    FROM staging_songs
";

/// Artist dimension rows from the song catalog.
pub const ARTIST_TABLE_INSERT: &str = "
    SELECT DISTINCT artist_id, artist_name, artist_location, artist_latitude, artist_longitude
    FROM staging_songs
";

/// Time dimension rows derived from the loaded fact timestamps.
pub const TIME_TABLE_INSERT: &str = "
    SELECT start_time,
        EXTRACT(hour FROM start_time),
        EXTRACT(day FROM start_time),
        EXTRACT(week FROM start_time),
        EXTRACT(month FROM start_time),
        EXTRACT(year FROM start_time),
        EXTRACT(dayofweek FROM start_time)
    FROM songplays
";
