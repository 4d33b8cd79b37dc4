// Arming and zone bypass against a scripted panel

mod common;

use std::time::Duration;

use ultrasync::AlarmScene;

fn form(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[tokio::test]
async fn test_set_alarm_bitmask_payload() {
    let mut panel = common::logged_in("zerowire").await;
    panel.transport().reply_body("");

    // area 1 is bank 0
    assert!(panel.set_alarm(&[1], AlarmScene::Stay).await.unwrap());

    let request = panel.transport().last_request();
    assert_eq!(panel.transport().paths(), vec!["user/keyfunction.cgi"]);
    assert_eq!(
        request.form,
        form(&[("sess", "A2D6C62695D705D8"), ("start", "0"), ("mask", "1"), ("fnum", "1")])
    );
    assert!(request.referer.ends_with("/login.cgi"));
}

#[tokio::test]
async fn test_set_alarm_second_area_mask() {
    let mut panel = common::logged_in("xgen").await;
    panel.transport().reply_body("");

    assert!(panel.set_alarm(&[2], AlarmScene::Away).await.unwrap());

    let request = panel.transport().last_request();
    assert_eq!(request.form_value("start"), Some("0"));
    assert_eq!(request.form_value("mask"), Some("2"));
    assert_eq!(request.form_value("fnum"), Some("15"));
}

#[tokio::test]
async fn test_set_alarm_empty_targets_every_area() {
    let mut panel = common::logged_in("xgen").await;
    panel.transport().reply_body("").reply_body("");

    assert!(panel.set_alarm(&[], AlarmScene::Disarm).await.unwrap());

    let requests = panel.transport().requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].form_value("mask"), Some("1"));
    assert_eq!(requests[1].form_value("mask"), Some("2"));
    assert!(requests.iter().all(|r| r.form_value("fnum") == Some("0")));
}

#[tokio::test]
async fn test_set_alarm_opcode_payload() {
    let mut panel = common::logged_in("xgen8").await;
    panel.transport().reply_body("");

    assert!(panel.set_alarm(&[1], AlarmScene::Away).await.unwrap());
    assert_eq!(
        panel.transport().last_request().form,
        form(&[
            ("sess", "7F3E99A0C4B21D56"),
            ("comm", "80"),
            ("data0", "2"),
            ("data1", "1"),
            ("data2", "17"),
        ])
    );
}

#[tokio::test]
async fn test_set_alarm_unknown_area_still_attempts_the_rest() {
    let mut panel = common::logged_in("xgen").await;
    panel.transport().reply_body("");

    assert!(!panel.set_alarm(&[6, 2], AlarmScene::Away).await.unwrap());

    let request = panel.transport().last_request();
    assert_eq!(panel.transport().paths(), vec!["user/keyfunction.cgi"]);
    assert_eq!(request.form_value("mask"), Some("2"));
    assert_eq!(request.form_value("fnum"), Some("15"));
}

#[tokio::test]
async fn test_set_alarm_rejects_area_zero() {
    let mut panel = common::logged_in("zerowire").await;

    assert!(!panel.set_alarm(&[0], AlarmScene::Stay).await.unwrap());
    assert!(panel.transport().requests().is_empty());
}

#[tokio::test]
async fn test_set_alarm_logs_in_first() {
    let mut panel = common::panel();
    panel
        .transport()
        .reply("comnav/area.htm")
        .reply("comnav/zones.htm")
        .reply_body("");

    assert!(panel.set_alarm(&[1], AlarmScene::Stay).await.unwrap());
    assert_eq!(
        panel.transport().paths(),
        vec!["login.cgi", "user/zones.htm", "user/keyfunction.cgi"]
    );
    assert_eq!(panel.transport().last_request().form_value("data2"), Some("18"));
}

#[tokio::test]
async fn test_zone_bypass_toggles_once() {
    let mut panel = common::logged_in("xgen8").await;
    panel
        .transport()
        .reply("xgen8/zonefunction.json")
        .reply("xgen8/seq.json")
        .reply("xgen8/zstate.json");

    // zone 1 is bank 0
    assert!(panel.set_zone_bypass(1, true).await.unwrap());
    assert_eq!(panel.transport().paths(), vec!["user/zonefunction.cgi"]);
    assert_eq!(
        panel.transport().last_request().form,
        form(&[("sess", "7F3E99A0C4B21D56"), ("comm", "82"), ("data0", "0")])
    );

    assert!(panel.update(Duration::ZERO).await.unwrap());
    assert!(panel.zone(0).unwrap().is_bypassed());

    // already bypassed: nothing to toggle
    panel.transport().forget_requests();
    assert!(panel.set_zone_bypass(1, true).await.unwrap());
    assert!(panel.transport().requests().is_empty());
}

#[tokio::test]
async fn test_zone_bypass_unknown_zone() {
    let mut panel = common::logged_in("xgen8").await;

    assert!(!panel.set_zone_bypass(21, true).await.unwrap());
    assert!(!panel.set_zone_bypass(0, true).await.unwrap());
    assert!(panel.transport().requests().is_empty());
}

#[tokio::test]
async fn test_zone_bypass_unsupported_on_bitmask_panels() {
    let mut panel = common::logged_in("zerowire").await;

    assert!(!panel.set_zone_bypass(1, true).await.unwrap());
    assert!(panel.transport().requests().is_empty());
}

#[tokio::test]
async fn test_zone_bypass_comnav() {
    let mut panel = common::logged_in("comnav").await;
    panel.transport().reply_body("<response>ok</response>");

    assert!(panel.set_zone_bypass(3, true).await.unwrap());
    assert_eq!(panel.transport().last_request().form_value("data0"), Some("2"));

    // restoring a zone that is not bypassed sends nothing
    panel.transport().forget_requests();
    assert!(panel.set_zone_bypass(2, false).await.unwrap());
    assert!(panel.transport().requests().is_empty());
}
