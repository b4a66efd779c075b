use regex::Regex;

lazy_static::lazy_static! {
    pub static ref ATTR_FILENAME: Regex = Regex::new(r#"filename="(.*?)""#).expect("valid regex");
    pub static ref ATTR_FILESIZE: Regex = Regex::new(r#"filesize="(.*?)""#).expect("valid regex");
    pub static ref ATTR_FILETYPE: Regex = Regex::new(r#"filetype="(.*?)""#).expect("valid regex");
    pub static ref ATTR_URL: Regex = Regex::new(r#"url="(.*?)""#).expect("valid regex");
    pub static ref ALBUM_IMG: Regex = Regex::new(
        r#"<img src="(.*?)" thumbnail="(.*?)" width="(.*?)" height="(.*?)" />"#
    ).expect("valid regex");
    pub static ref ATTR_TITLE: Regex = Regex::new(r#"title="(.*?)""#).expect("valid regex");
    pub static ref ATTR_DESCRIPTION: Regex = Regex::new(r#"description="(.*?)""#).expect("valid regex");
    pub static ref ATTR_TYPE: Regex = Regex::new(r#"type="(.*?)""#).expect("valid regex");
    pub static ref ATTR_FROM: Regex = Regex::new(r#"from="(.*?)""#).expect("valid regex");
    pub static ref ATTR_TO: Regex = Regex::new(r#"to="(.*?)""#).expect("valid regex");
    pub static ref TRANSLATION_ORIGINAL: Regex = Regex::new(r"<original>(.*?)</original>").expect("valid regex");
    pub static ref TRANSLATION_TEXT: Regex = Regex::new(r"<translation[^>]*>(.*?)</translation>").expect("valid regex");

    pub static ref POLL_QUESTION: Regex = Regex::new(r"<pollquestion>(.*?)</pollquestion>").expect("valid regex");
    pub static ref POLL_OPTION: Regex = Regex::new(r"<polloption>(.*?)</polloption>").expect("valid regex");

    pub static ref CALL_DURATION: Regex = Regex::new(r"<duration>(.*?)</duration>").expect("valid regex");
    pub static ref CALL_PARTICIPANT: Regex = Regex::new(
        r#"<participant id="(.*?)" name="(.*?)"></participant>"#
    ).expect("valid regex");

    pub static ref LOCATION_LATITUDE: Regex = Regex::new(r#"<location latitude="(.*?)""#).expect("valid regex");
    pub static ref LOCATION_LONGITUDE: Regex = Regex::new(r#"longitude="(.*?)""#).expect("valid regex");
    pub static ref LOCATION_ADDRESS: Regex = Regex::new(r"<address>(.*?)</address>").expect("valid regex");

    pub static ref CONTACT: Regex = Regex::new(
        r#"<contact name="(.*?)" phone="(.*?)" email="(.*?)"></contact>"#
    ).expect("valid regex");

    pub static ref ACTIVITY_MEMBER: Regex = Regex::new(r#"<member id="(.*?)" name="(.*?)"></member>"#).expect("valid regex");
    pub static ref ACTIVITY_INITIATOR: Regex = Regex::new(r#"<initiator name="(.*?)"></initiator>"#).expect("valid regex");
    pub static ref ACTIVITY_VALUE: Regex = Regex::new(r"<value>(.*?)</value>").expect("valid regex");

    pub static ref SCHEDULED_CALL_TAG: Regex = Regex::new(r#"<scheduledcall\b"#).expect("valid regex");
    pub static ref ATTR_TIME: Regex = Regex::new(r#"time="(.*?)""#).expect("valid regex");
    pub static ref ATTR_DURATION: Regex = Regex::new(r#"duration="(.*?)""#).expect("valid regex");
}

pub fn capture1(re: &Regex, content: &str) -> Option<String> {
    re.captures(content).map(|c| c[1].to_string())
}
