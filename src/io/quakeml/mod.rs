//! Write [`Event`](crate::event::Event)s as [QuakeML 1.2](https://quake.ethz.ch/quakeml/) documents
//! following the ANSS catalog conventions.
mod markup;
mod writer;

pub use markup::{Tag, TagContent};
pub use writer::{
    quakeml_path, to_quakeml, write_quakeml, QuakeMLError, ANSS_CATALOG_NAMESPACE,
    QUAKEML_BED_NAMESPACE, QUAKEML_NAMESPACE,
};

#[cfg(test)]
mod test {
    use std::fs;

    use chrono::{NaiveDate, NaiveDateTime};
    use quick_xml::events::Event as XMLEvent;
    use quick_xml::Reader;

    use super::*;
    use crate::event::{
        ErrorEllipse, EvaluationMode, EvaluationStatus, Event, EventError, FocalMechanism,
        Magnitude, MomentTensor, NodalPlane, Origin, Phase, PreferredKind, PrincipalAxis,
        Quantity,
    };

    fn origin_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2011, 8, 23)
            .unwrap()
            .and_hms_milli_opt(17, 51, 3, 520)
            .unwrap()
    }

    fn origin(id: &str, preferred: bool) -> Origin {
        Origin::new(
            id,
            preferred,
            origin_time().into(),
            37.9212.into(),
            (-78.0054).into(),
            Quantity::uncertain(9600.0, 1700.0),
        )
    }

    fn simple_event() -> Event {
        Event::new(
            "se609212",
            "se",
            "us",
            vec![origin("se609212", true)],
            vec![Magnitude::new(5.8, "Mw", true).with_author("ISC")],
        )
        .unwrap()
    }

    /// Collect the text of every element with the given name, in document order
    fn element_texts(xml: &str, name: &str) -> Vec<String> {
        let mut reader = Reader::from_str(xml);
        let mut texts = Vec::new();
        let mut inside = false;
        loop {
            match reader.read_event().unwrap() {
                XMLEvent::Start(e) if e.name().as_ref() == name.as_bytes() => inside = true,
                XMLEvent::Text(t) if inside => {
                    texts.push(t.unescape().unwrap().into_owned());
                    inside = false;
                }
                XMLEvent::End(_) => inside = false,
                XMLEvent::Eof => break,
                _ => {}
            }
        }
        texts
    }

    fn count_elements(xml: &str, name: &str) -> usize {
        let mut reader = Reader::from_str(xml);
        let mut count = 0;
        loop {
            match reader.read_event().unwrap() {
                XMLEvent::Start(e) | XMLEvent::Empty(e) if e.name().as_ref() == name.as_bytes() => {
                    count += 1
                }
                XMLEvent::Eof => break,
                _ => {}
            }
        }
        count
    }

    #[test]
    fn test_event_attributes_round_trip() {
        let xml = to_quakeml(&simple_event()).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(!xml.contains('\n'));

        let mut reader = Reader::from_str(&xml);
        let mut events = Vec::new();
        loop {
            match reader.read_event().unwrap() {
                XMLEvent::Start(e) if e.name().as_ref() == b"event" => {
                    let get = |key: &str| {
                        e.try_get_attribute(key)
                            .unwrap()
                            .unwrap()
                            .unescape_value()
                            .unwrap()
                            .into_owned()
                    };
                    events.push((
                        get("catalog:eventid"),
                        get("catalog:eventsource"),
                        get("catalog:datasource"),
                        get("catalog:dataid"),
                        get("publicID"),
                    ));
                }
                XMLEvent::Eof => break,
                _ => {}
            }
        }
        assert_eq!(events.len(), 1);
        let (id, source, datasource, dataid, public_id) = &events[0];
        assert_eq!(id, "se609212");
        assert_eq!(source, "se");
        assert_eq!(datasource, "us");
        assert_eq!(dataid, "sese609212");
        assert_eq!(public_id, "quakeml:se.anss.org/event/se609212");
        assert!(xml.contains(r#"<eventParameters publicID="quakeml:us.anss.org/eventParameters/se609212">"#));
    }

    #[test]
    fn test_magnitude_and_origin_rendering() {
        let xml = to_quakeml(&simple_event()).unwrap();
        assert!(xml.contains(concat!(
            r#"<magnitude publicID="quakeml:us.anss.org/magnitude/se609212/Mw">"#,
            "<mag><value>5.80</value></mag><type>Mw</type>",
            "<creationInfo><author>ISC</author></creationInfo></magnitude>"
        )));
        assert!(xml.contains(r#"<origin publicID="quakeml:us.anss.org/origin/se609212">"#));
        assert_eq!(element_texts(&xml, "value")[1], "2011-08-23T17:51:03Z");
        assert!(xml.contains("<latitude><value>37.9212</value></latitude>"));
        assert!(xml.contains("<longitude><value>-78.0054</value></longitude>"));
        assert!(xml.contains(
            "<depth><value>9600.0</value><uncertainty>1700.00</uncertainty></depth>"
        ));
        assert!(xml.ends_with(concat!(
            "<preferredOriginID>quakeml:us.anss.org/origin/se609212</preferredOriginID>",
            "<preferredMagnitudeID>quakeml:us.anss.org/magnitude/se609212/Mw</preferredMagnitudeID>",
            "</event></eventParameters></q:quakeml>"
        )));
    }

    #[test]
    fn test_quantity_rendering() {
        let mut event = simple_event();
        event.origins[0].latitude = Quantity::Value(37.9);
        event.origins[0].longitude = Quantity::uncertain(-78.0, 0.25);
        event.origins[0].depth = Quantity::bounded(6000.0, 1500.0, 2500.0);
        let xml = to_quakeml(&event).unwrap();

        assert!(xml.contains("<latitude><value>37.9000</value></latitude>"));
        assert!(xml.contains(
            "<longitude><value>-78.0000</value><uncertainty>0.25</uncertainty></longitude>"
        ));
        assert!(xml.contains(concat!(
            "<depth><value>6000.0</value><lowerUncertainty>1500.00</lowerUncertainty>",
            "<upperUncertainty>2500.00</upperUncertainty></depth>"
        )));
        assert_eq!(count_elements(&xml, "uncertainty"), 1);
        assert_eq!(count_elements(&xml, "lowerUncertainty"), 1);
    }

    #[test]
    fn test_multiple_preferred() {
        let mut event = simple_event();
        event.origins.push(origin("second", true));
        assert!(matches!(
            to_quakeml(&event),
            Err(QuakeMLError::Event(EventError::MultiplePreferred(
                PreferredKind::Origin
            )))
        ));

        let mut event = simple_event();
        event.magnitudes.push(Magnitude::new(5.7, "ML", true));
        assert!(matches!(
            to_quakeml(&event),
            Err(QuakeMLError::Event(EventError::MultiplePreferred(
                PreferredKind::Magnitude
            )))
        ));
    }

    #[test]
    fn test_missing_method() {
        let event = simple_event().with_focal_mechanism(FocalMechanism::default());
        assert!(matches!(
            to_quakeml(&event),
            Err(QuakeMLError::MissingField {
                record: "focal mechanism",
                field: "method",
                ..
            })
        ));
    }

    #[test]
    fn test_origin_details_and_picks() {
        let mut preferred = origin("se609212", true)
            .with_ellipse(ErrorEllipse::new(0.57, 0.51, 50.0))
            .with_evaluation(EvaluationMode::Manual, EvaluationStatus::Reviewed);
        let time = origin_time();
        for (id, station, weight) in [("1", "SE.URVA.HHZ.--", 1), ("2", "PSUB", 0)] {
            preferred.add_or_replace_phase(Phase {
                id: id.to_string(),
                name: "Pg".to_string(),
                distance: 0.51,
                azimuth: 133.0,
                time,
                station: station.to_string(),
                residual: -0.1,
                weight,
            });
        }
        let event = Event::new(
            "se609212",
            "se",
            "us",
            vec![preferred],
            vec![Magnitude::new(5.8, "Mw", true)],
        )
        .unwrap()
        .with_comment("relocated\twith mloc\n");
        let xml = to_quakeml(&event).unwrap();

        assert!(xml.contains("<comment><text>relocatedwith mloc</text></comment>"));
        assert!(xml.contains(concat!(
            "<originUncertainty><confidenceEllipsoid><semiMajorAxisLength>0.57</semiMajorAxisLength>",
            "<semiMinorAxisLength>0.51</semiMinorAxisLength><majorAxisAzimuth>50.00</majorAxisAzimuth>",
            "</confidenceEllipsoid></originUncertainty>"
        )));
        assert!(xml.contains(
            "<evaluationMode>manual</evaluationMode><evaluationStatus>reviewed</evaluationStatus></origin>"
        ));
        assert!(xml.contains(concat!(
            r#"<pick publicID="quakeml:us.anss.org/pick/se609212/us_1">"#,
            "<time><value>2011-08-23T17:51:03Z</value></time>",
            r#"<waveformID networkCode="SE" stationCode="URVA" channelCode="HHZ"/>"#,
            "<phaseHint>Pg</phaseHint><evaluationMode>manual</evaluationMode></pick>"
        )));
        assert!(xml.contains(r#"<waveformID stationCode="PSUB"/>"#));
        assert!(xml.contains(concat!(
            r#"<arrival publicID="quakeml:us.anss.org/arrival/se609212/us_2">"#,
            "<pickID>quakeml:us.anss.org/pick/se609212/us_2</pickID><phase>Pg</phase>",
            "<azimuth>133.00</azimuth><distance>0.51</distance>",
            "<timeResidual>-0.10</timeResidual><timeWeight>0.00</timeWeight></arrival>"
        )));
        // Picks belong to the event and precede the origin they were read with
        let pick_at = xml.find("<pick ").unwrap();
        let origin_at = xml.find("<origin ").unwrap();
        assert!(pick_at < origin_at);
    }

    #[test]
    fn test_focal_mechanism_and_moment_tensor() {
        let focal = FocalMechanism {
            method: Some("Mwc".to_string()),
            nodal_plane_1: NodalPlane::new(9.0, 29.0, 142.0),
            nodal_plane_2: NodalPlane::new(133.0, 72.0, 66.0),
            t_axis: PrincipalAxis::new(1.581e16, 56.0, 12.0),
            n_axis: PrincipalAxis::new(-5.37e15, 23.0, 140.0),
            p_axis: PrincipalAxis::new(-1.044e16, 24.0, 241.0),
            evaluation_status: EvaluationStatus::Reviewed,
        };
        let tensor = MomentTensor {
            method: Some("Mwc".to_string()),
            mrr: Quantity::uncertain(8.38e15, 2.01e15),
            mtt: Quantity::Value(-5e13),
            scalar_moment: 1.5e16,
            double_couple: Some(0.75),
            ..Default::default()
        };
        let event = simple_event()
            .with_focal_mechanism(focal)
            .with_moment_tensor(tensor.clone());
        let xml = to_quakeml(&event).unwrap();

        assert!(xml.contains(r#"<focalMechanism publicID="quakeml:us.anss.org/focalmechanism/se609212/Mwc">"#));
        assert!(xml.contains(concat!(
            "<nodalPlane1><strike><value>9</value></strike><dip><value>29</value></dip>",
            "<rake><value>142</value></rake></nodalPlane1>"
        )));
        assert!(xml.contains(concat!(
            "<tAxis><azimuth><value>12</value></azimuth><plunge><value>56</value></plunge>",
            "<length><value>15810000000000000</value></length></tAxis>"
        )));
        assert!(xml.contains(r#"<momentTensor publicID="quakeml:us.anss.org/momenttensor/se609212/Mwc">"#));
        assert!(xml.contains("<scalarMoment><value>15000000000000000</value></scalarMoment>"));
        assert!(xml.contains("<Mrr><value>8.38e15</value><uncertainty>2.01e15</uncertainty></Mrr>"));
        assert!(xml.contains("<Mtt><value>-5e13</value></Mtt>"));
        assert!(xml.contains("<doubleCouple>0.750</doubleCouple>"));
        // The tensor lives inside the focal mechanism
        assert!(xml.contains("</momentTensor></focalMechanism>"));
        assert_eq!(count_elements(&xml, "focalMechanism"), 1);

        let bare = simple_event().with_moment_tensor(tensor);
        let xml = to_quakeml(&bare).unwrap();
        assert_eq!(count_elements(&xml, "focalMechanism"), 1);
        assert_eq!(count_elements(&xml, "nodalPlanes"), 0);
        assert_eq!(count_elements(&xml, "momentTensor"), 1);
    }

    #[cfg(feature = "iscgem")]
    #[test]
    fn test_iscgem_documents() {
        use crate::io::iscgem::IscGemReader;

        let file = fs::File::open("./test/data/isc-gem-cat.csv").expect("Test file doesn't exist");
        let documents: Vec<String> = IscGemReader::new(file)
            .map(|event| to_quakeml(&event.unwrap()).unwrap())
            .collect();
        assert_eq!(documents.len(), 2);

        let loma = &documents[0];
        assert!(loma.contains(r#"catalog:eventid="389808""#));
        assert!(loma.contains("<latitude><value>37.0740</value></latitude>"));
        assert!(loma.contains("<mag><value>6.89</value></mag>"));
        assert!(loma.contains("<semiMajorAxisLength>4.40</semiMajorAxisLength>"));
        assert!(loma.contains("<semiMinorAxisLength>3.30</semiMinorAxisLength>"));

        let northridge = &documents[1];
        assert!(northridge.contains(r#"catalog:eventid="189275""#));
        assert!(northridge.contains("<latitude><value>34.1640</value></latitude>"));
        assert!(northridge.contains("<mag><value>6.65</value></mag>"));
    }

    #[cfg(feature = "ndk")]
    #[test]
    fn test_ndk_documents() {
        use crate::io::ndk::NdkReader;

        let file = fs::File::open("./test/data/gcmt.ndk").expect("Test file doesn't exist");
        for event in NdkReader::new(file) {
            let event = event.unwrap();
            let xml = to_quakeml(&event).unwrap();
            assert_eq!(count_elements(&xml, "origin"), 2);
            assert_eq!(count_elements(&xml, "focalMechanism"), 1);
            assert_eq!(count_elements(&xml, "dataUsed"), 3);
            assert_eq!(count_elements(&xml, "sourceTimeFunction"), 1);
            assert_eq!(count_elements(&xml, "Mrr"), 1);
            assert!(xml.contains("<waveType>body waves</waveType>"));
        }
    }

    #[cfg(feature = "mloc")]
    #[test]
    fn test_mloc_documents() {
        use crate::io::mloc::MlocReader;

        let file = fs::File::open("./test/data/mloc.comcat").expect("Test file doesn't exist");
        let events: Vec<Event> = MlocReader::new(file)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        let xml = to_quakeml(&events[0]).unwrap();
        assert_eq!(count_elements(&xml, "pick"), 6);
        assert_eq!(count_elements(&xml, "arrival"), 6);
        assert!(xml.contains(r#"<waveformID stationCode="URVA"/>"#));
        assert_eq!(count_elements(&xml, "comment"), 1);
    }

    #[test]
    fn test_write_quakeml() -> std::io::Result<()> {
        let tmpdir = tempfile::tempdir()?;
        assert_eq!(
            quakeml_path("us1234", tmpdir.path(), Some("ndk")),
            tmpdir.path().join("us1234_ndk.xml")
        );
        let xml = to_quakeml(&simple_event())?;
        let path = write_quakeml(&xml, "se609212", tmpdir.path(), None)?;
        assert_eq!(path, tmpdir.path().join("se609212.xml"));
        assert_eq!(fs::read_to_string(&path)?, xml);
        Ok(())
    }
}
