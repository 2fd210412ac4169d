//! Parsing of complete `iwlist <iface> scan` transcripts.

use wifi_survey::{parse, MalformedKind, SurveyStore};

const TWO_CELLS: &str = r#"wlan0     Scan completed :
          Cell 01 - Address: AA:BB:CC:DD:EE:FF
                    Channel:6
                    Frequency:2.437 GHz (Channel 6)
                    Quality=51/70  Signal level=-59 dBm
                    Encryption key:on
                    ESSID:"HomeNet"
                    Bit Rates:1 Mb/s; 2 Mb/s; 5.5 Mb/s; 11 Mb/s; 6 Mb/s
                              9 Mb/s; 12 Mb/s; 18 Mb/s
                    Mode:Master
                    Extra:tsf=0000000000000000
                    Extra: Last beacon: 40ms ago
                    IE: Unknown: 0007486F6D654E6574
                    IE: IEEE 802.11i/WPA2 Version 1
                        Group Cipher : CCMP
                        Pairwise Ciphers (1) : CCMP
                        Authentication Suites (1) : PSK
          Cell 02 - Address: 11:22:33:44:55:66
                    Channel:36
                    Frequency:5.18 GHz (Channel 36)
                    Quality=27/70  Signal level=-83 dBm
                    Encryption key:off
                    ESSID:""
                    Mode:Master
"#;

#[test]
fn test_two_cell_transcript() {
    let obs = parse(TWO_CELLS).unwrap();
    assert_eq!(obs.len(), 2);

    assert_eq!(obs[0].address, "AA:BB:CC:DD:EE:FF");
    assert_eq!(obs[0].essid, "HomeNet");
    assert_eq!(obs[0].frequency, "2.437");
    assert_eq!(obs[0].channel, 6);
    assert_eq!(obs[0].signal_level, "-59");
    assert!((obs[0].quality - 0.7286).abs() < 1e-4);

    assert_eq!(obs[1].address, "11:22:33:44:55:66");
    assert_eq!(obs[1].essid, "");
    assert_eq!(obs[1].channel, 36);
    assert!((obs[1].quality - 27.0 / 70.0).abs() < 1e-12);
}

#[test]
fn test_many_cells_in_order() {
    let mut raw = String::from("wlan0     Scan completed :\n");
    for i in 1..=25 {
        raw.push_str(&format!(
            "          Cell {i:02} - Address: 02:00:00:00:00:{i:02X}\n\
             \x20                   Frequency:2.412 GHz (Channel 1)\n\
             \x20                   Quality={i}/70  Signal level=-{} dBm\n\
             \x20                   ESSID:\"net-{i}\"\n",
            100 - i
        ));
    }
    let obs = parse(&raw).unwrap();
    assert_eq!(obs.len(), 25);
    for (idx, o) in obs.iter().enumerate() {
        let i = idx + 1;
        assert_eq!(o.essid, format!("net-{i}"));
        assert_eq!(o.address, format!("02:00:00:00:00:{i:02X}"));
    }
}

#[test]
fn test_truncated_transcript_rejected() {
    let cut = TWO_CELLS
        .find("ESSID:\"\"")
        .map(|pos| &TWO_CELLS[..pos])
        .unwrap();
    let err = parse(cut).unwrap_err();
    assert_eq!(err.kind, MalformedKind::IncompleteRecord);
    assert_eq!(err.line, "Cell 02 - Address: 11:22:33:44:55:66");
}

#[test]
fn test_parse_and_store() {
    let mut store = SurveyStore::open_in_memory().unwrap();
    let scan = store.insert_scan("living room", TWO_CELLS).unwrap();
    let obs = parse(&store.scan(scan.id).unwrap().data).unwrap();
    store.insert_observations(scan.id, &obs).unwrap();

    let stored = store.all_observations().unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|s| s.scan_id == scan.id));
    assert_eq!(stored[0].observation, obs[0]);
}
