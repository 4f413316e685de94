use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use log::debug;
use quick_xml::events::{BytesDecl, Event as XMLEvent};
use quick_xml::{Error as XMLError, Writer};
use thiserror::Error;

use super::markup::Tag;
use crate::event::{
    Event, EventError, FocalMechanism, Magnitude, MomentTensor, Origin, Phase, PrincipalAxis,
    Quantity, WaveUsage,
};

pub const QUAKEML_BED_NAMESPACE: &str = "http://quakeml.org/xmlns/bed/1.2";
pub const ANSS_CATALOG_NAMESPACE: &str = "http://anss.org/xmlns/catalog/0.1";
pub const QUAKEML_NAMESPACE: &str = "http://quakeml.org/xmlns/quakeml/1.2";

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Error)]
pub enum QuakeMLError {
    #[error("Cannot serialize an invalid event: {0}")]
    Event(
        #[from]
        #[source]
        EventError,
    ),
    #[error("The {record} of event {event_id} has no {field}")]
    MissingField {
        event_id: String,
        record: &'static str,
        field: &'static str,
    },
    #[error("Failed to write XML: {0}")]
    XMLError(
        #[from]
        #[source]
        XMLError,
    ),
    #[error("Encountered an IO error: {0}")]
    IOError(
        #[from]
        #[source]
        io::Error,
    ),
}

impl From<QuakeMLError> for io::Error {
    fn from(value: QuakeMLError) -> Self {
        match value {
            QuakeMLError::IOError(e) => e,
            err => io::Error::new(io::ErrorKind::InvalidData, err),
        }
    }
}

/// Render an XML element holding a [`Quantity`] as `value` plus whichever
/// uncertainty elements the quantity carries
fn quantity_tag<T>(name: &str, quantity: &Quantity<T>, format_value: impl Fn(&T) -> String) -> Tag {
    let mut tag = Tag::new(name);
    tag.add_child(Tag::with_text("value", format_value(quantity.value())));
    match quantity {
        Quantity::Value(_) => {}
        Quantity::Uncertain { uncertainty, .. } => {
            tag.add_child(Tag::with_text("uncertainty", format!("{uncertainty:.2}")));
        }
        Quantity::Bounded { lower, upper, .. } => {
            tag.add_child(Tag::with_text("lowerUncertainty", format!("{lower:.2}")));
            tag.add_child(Tag::with_text("upperUncertainty", format!("{upper:.2}")));
        }
    }
    tag
}

/// An element wrapping a single `value` child
fn value_tag<T: ToString>(name: &str, value: T) -> Tag {
    let mut tag = Tag::new(name);
    tag.add_child(Tag::with_text("value", value));
    tag
}

fn format_time(time: &NaiveDateTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

fn magnitude_id(event_id: &str, magnitude: &Magnitude) -> String {
    format!(
        "quakeml:us.anss.org/magnitude/{event_id}/{}",
        magnitude.magnitude_type
    )
}

fn origin_id(origin: &Origin) -> String {
    format!("quakeml:us.anss.org/origin/{}", origin.id)
}

fn pick_id(event_id: &str, phase: &Phase) -> String {
    format!("quakeml:us.anss.org/pick/{event_id}/us_{}", phase.id)
}

fn magnitude_tag(event_id: &str, magnitude: &Magnitude) -> Tag {
    let mut tag = Tag::new("magnitude");
    tag.set_attribute("publicID", magnitude_id(event_id, magnitude));
    tag.add_child(value_tag("mag", format!("{:.2}", magnitude.value)));
    tag.add_child(Tag::with_text("type", &magnitude.magnitude_type));
    if let Some(author) = magnitude.author.as_ref() {
        let mut creation_info = Tag::new("creationInfo");
        creation_info.add_child(Tag::with_text("author", author));
        tag.add_child(creation_info);
    }
    tag
}

/// Split a `NET.STA.CHA.LOC` code into `waveformID` attributes. Components that are
/// empty or only hyphens are left out, and a code without any `.` is a bare station.
fn waveform_tag(station: &str) -> Tag {
    const CODE_NAMES: [&str; 4] = ["networkCode", "stationCode", "channelCode", "locationCode"];
    let mut tag = Tag::new("waveformID");
    let is_blank = |part: &str| part.trim().trim_matches('-').is_empty();
    if !station.contains('.') {
        if !is_blank(station) {
            tag.set_attribute("stationCode", station);
        }
        return tag;
    }
    for (name, part) in CODE_NAMES.iter().zip(station.split('.')) {
        if !is_blank(part) {
            tag.set_attribute(name, part);
        }
    }
    tag
}

fn pick_tag(event_id: &str, phase: &Phase) -> Tag {
    let mut tag = Tag::new("pick");
    tag.set_attribute("publicID", pick_id(event_id, phase));
    tag.add_child(value_tag("time", format_time(&phase.time)));
    tag.add_child(waveform_tag(&phase.station));
    tag.add_child(Tag::with_text("phaseHint", &phase.name));
    tag.add_child(Tag::with_text("evaluationMode", "manual"));
    tag
}

fn arrival_tag(event_id: &str, phase: &Phase) -> Tag {
    let mut tag = Tag::new("arrival");
    tag.set_attribute(
        "publicID",
        format!("quakeml:us.anss.org/arrival/{event_id}/us_{}", phase.id),
    );
    tag.add_child(Tag::with_text("pickID", pick_id(event_id, phase)));
    tag.add_child(Tag::with_text("phase", &phase.name));
    tag.add_child(Tag::with_text("azimuth", format!("{:.2}", phase.azimuth)));
    tag.add_child(Tag::with_text("distance", format!("{:.2}", phase.distance)));
    tag.add_child(Tag::with_text(
        "timeResidual",
        format!("{:.2}", phase.residual),
    ));
    tag.add_child(Tag::with_text(
        "timeWeight",
        format!("{:.2}", phase.weight as f64),
    ));
    tag
}

fn origin_tag(event_id: &str, origin: &Origin) -> Tag {
    let mut tag = Tag::new("origin");
    tag.set_attribute("publicID", origin_id(origin));
    tag.add_child(quantity_tag("time", &origin.time, format_time));
    tag.add_child(quantity_tag("latitude", &origin.latitude, |v| format!("{v:.4}")));
    tag.add_child(quantity_tag("longitude", &origin.longitude, |v| format!("{v:.4}")));
    tag.add_child(quantity_tag("depth", &origin.depth, |v| format!("{v:.1}")));

    if let Some(ellipse) = origin.ellipse.as_ref() {
        let mut ellipsoid = Tag::new("confidenceEllipsoid");
        ellipsoid.add_child(Tag::with_text(
            "semiMajorAxisLength",
            format!("{:.2}", ellipse.major),
        ));
        ellipsoid.add_child(Tag::with_text(
            "semiMinorAxisLength",
            format!("{:.2}", ellipse.minor),
        ));
        ellipsoid.add_child(Tag::with_text(
            "majorAxisAzimuth",
            format!("{:.2}", ellipse.azimuth),
        ));
        let mut uncertainty = Tag::new("originUncertainty");
        uncertainty.add_child(ellipsoid);
        tag.add_child(uncertainty);
    }

    if let Some(quality) = origin.quality.as_ref() {
        let mut quality_tag = Tag::new("quality");
        quality_tag.add_child(Tag::with_text("usedPhaseCount", quality.phase_count));
        quality_tag.add_child(Tag::with_text("usedStationCount", quality.station_count));
        quality_tag.add_child(Tag::with_text("standardError", quality.standard_error));
        quality_tag.add_child(Tag::with_text("azimuthalGap", quality.azimuthal_gap));
        quality_tag.add_child(Tag::with_text("minimumDistance", quality.minimum_distance));
        tag.add_child(quality_tag);
    }

    for phase in origin.phases.iter() {
        tag.add_child(arrival_tag(event_id, phase));
    }

    if let Some(mode) = origin.evaluation_mode {
        tag.add_child(Tag::with_text("evaluationMode", mode));
    }
    if let Some(status) = origin.evaluation_status {
        tag.add_child(Tag::with_text("evaluationStatus", status));
    }
    tag
}

fn axis_tag(name: &str, axis: &PrincipalAxis) -> Tag {
    let mut tag = Tag::new(name);
    tag.add_child(value_tag("azimuth", format!("{:.0}", axis.azimuth)));
    tag.add_child(value_tag("plunge", format!("{:.0}", axis.plunge)));
    tag.add_child(value_tag("length", axis.value));
    tag
}

fn require_method<'a>(
    event_id: &str,
    record: &'static str,
    method: Option<&'a String>,
) -> Result<&'a str, QuakeMLError> {
    match method {
        Some(method) if !method.is_empty() => Ok(method),
        _ => Err(QuakeMLError::MissingField {
            event_id: event_id.to_string(),
            record,
            field: "method",
        }),
    }
}

fn focal_mechanism_tag(event_id: &str, focal: &FocalMechanism) -> Result<Tag, QuakeMLError> {
    let method = require_method(event_id, "focal mechanism", focal.method.as_ref())?;
    let mut tag = Tag::new("focalMechanism");
    tag.set_attribute(
        "publicID",
        format!("quakeml:us.anss.org/focalmechanism/{event_id}/{method}"),
    );

    let mut planes = Tag::new("nodalPlanes");
    for (name, plane) in [
        ("nodalPlane1", &focal.nodal_plane_1),
        ("nodalPlane2", &focal.nodal_plane_2),
    ] {
        let mut plane_tag = Tag::new(name);
        plane_tag.add_child(value_tag("strike", format!("{:.0}", plane.strike)));
        plane_tag.add_child(value_tag("dip", format!("{:.0}", plane.dip)));
        plane_tag.add_child(value_tag("rake", format!("{:.0}", plane.rake)));
        planes.add_child(plane_tag);
    }
    tag.add_child(planes);

    let mut axes = Tag::new("principalAxes");
    axes.add_child(axis_tag("tAxis", &focal.t_axis));
    axes.add_child(axis_tag("nAxis", &focal.n_axis));
    axes.add_child(axis_tag("pAxis", &focal.p_axis));
    tag.add_child(axes);

    tag.add_child(Tag::with_text("evaluationMode", "manual"));
    tag.add_child(Tag::with_text(
        "evaluationStatus",
        focal.evaluation_status,
    ));
    Ok(tag)
}

fn data_used_tag(wave_type: &str, usage: &WaveUsage) -> Tag {
    let mut tag = Tag::new("dataUsed");
    tag.add_child(Tag::with_text("waveType", wave_type));
    tag.add_child(Tag::with_text("stationCount", usage.station_count));
    tag.add_child(Tag::with_text("componentCount", usage.channel_count));
    tag
}

fn moment_tensor_tag(event_id: &str, tensor: &MomentTensor) -> Result<Tag, QuakeMLError> {
    let method = require_method(event_id, "moment tensor", tensor.method.as_ref())?;
    let mut tag = Tag::new("momentTensor");
    tag.set_attribute(
        "publicID",
        format!("quakeml:us.anss.org/momenttensor/{event_id}/{method}"),
    );
    tag.add_child(value_tag(
        "scalarMoment",
        format!("{:.0}", tensor.scalar_moment.trunc()),
    ));

    let mut components = Tag::new("tensor");
    for (name, component) in tensor.components() {
        let mut component_tag = Tag::new(name);
        component_tag.add_child(Tag::with_text("value", format!("{:e}", component.value())));
        if let Some(uncertainty) = component.uncertainty() {
            component_tag.add_child(Tag::with_text("uncertainty", format!("{uncertainty:e}")));
        }
        components.add_child(component_tag);
    }
    tag.add_child(components);

    for (wave_type, usage) in [
        ("body waves", &tensor.body_waves),
        ("surface waves", &tensor.surface_waves),
        ("mantle waves", &tensor.mantle_waves),
    ] {
        if let Some(usage) = usage {
            tag.add_child(data_used_tag(wave_type, usage));
        }
    }

    if let Some(stf) = tensor.source_time_function.as_ref() {
        let mut stf_tag = Tag::new("sourceTimeFunction");
        stf_tag.add_child(Tag::with_text("type", stf.function_type));
        stf_tag.add_child(Tag::with_text("duration", format!("{:.1}", stf.duration)));
        if let Some(rise_time) = stf.rise_time {
            stf_tag.add_child(Tag::with_text("riseTime", format!("{rise_time:.1}")));
        }
        if let Some(decay_time) = stf.decay_time {
            stf_tag.add_child(Tag::with_text("decayTime", format!("{decay_time:.1}")));
        }
        tag.add_child(stf_tag);
    }
    if let Some(double_couple) = tensor.double_couple {
        tag.add_child(Tag::with_text(
            "doubleCouple",
            format!("{double_couple:.3}"),
        ));
    }
    if let Some(clvd) = tensor.clvd {
        tag.add_child(Tag::with_text("clvd", format!("{clvd:.3}")));
    }
    if let Some(inversion_type) = tensor.inversion_type {
        tag.add_child(Tag::with_text("inversionType", inversion_type));
    }
    Ok(tag)
}

/// Build the `q:quakeml` element tree for a validated event
fn event_document(event: &Event) -> Result<Tag, QuakeMLError> {
    let event_id = event.id.as_str();
    let mut root = Tag::new("q:quakeml");
    root.set_attribute("xmlns", QUAKEML_BED_NAMESPACE)
        .set_attribute("xmlns:catalog", ANSS_CATALOG_NAMESPACE)
        .set_attribute("xmlns:q", QUAKEML_NAMESPACE);

    let mut parameters = Tag::new("eventParameters");
    parameters.set_attribute(
        "publicID",
        format!(
            "quakeml:{}.anss.org/eventParameters/{event_id}",
            event.contributor
        ),
    );

    let mut event_tag = Tag::new("event");
    event_tag
        .set_attribute("catalog:eventid", event_id)
        .set_attribute("catalog:eventsource", &event.catalog)
        .set_attribute("catalog:dataid", format!("{}{event_id}", event.catalog))
        .set_attribute("catalog:datasource", &event.contributor)
        .set_attribute(
            "publicID",
            format!("quakeml:{}.anss.org/event/{event_id}", event.catalog),
        );

    if let Some(comment) = event.comment.as_ref() {
        let mut comment_tag = Tag::new("comment");
        comment_tag.add_child(Tag::with_text("text", comment));
        event_tag.add_child(comment_tag);
    }

    for magnitude in event.magnitudes.iter() {
        event_tag.add_child(magnitude_tag(event_id, magnitude));
    }

    for origin in event.origins.iter() {
        for phase in origin.phases.iter() {
            event_tag.add_child(pick_tag(event_id, phase));
        }
        event_tag.add_child(origin_tag(event_id, origin));
    }

    match (event.focal_mechanism.as_ref(), event.moment_tensor.as_ref()) {
        (Some(focal), tensor) => {
            let mut focal_tag = focal_mechanism_tag(event_id, focal)?;
            if let Some(tensor) = tensor {
                focal_tag.add_child(moment_tensor_tag(event_id, tensor)?);
            }
            event_tag.add_child(focal_tag);
        }
        (None, Some(tensor)) => {
            let tensor_tag = moment_tensor_tag(event_id, tensor)?;
            let method = require_method(event_id, "moment tensor", tensor.method.as_ref())?;
            let mut focal_tag = Tag::new("focalMechanism");
            focal_tag.set_attribute(
                "publicID",
                format!("quakeml:us.anss.org/focalmechanism/{event_id}/{method}"),
            );
            focal_tag.add_child(tensor_tag);
            event_tag.add_child(focal_tag);
        }
        (None, None) => {}
    }

    if let Some(origin) = event.preferred_origin() {
        event_tag.add_child(Tag::with_text("preferredOriginID", origin_id(origin)));
    }
    if let Some(magnitude) = event.preferred_magnitude() {
        event_tag.add_child(Tag::with_text(
            "preferredMagnitudeID",
            magnitude_id(event_id, magnitude),
        ));
    }

    parameters.add_child(event_tag);
    root.add_child(parameters);
    Ok(root)
}

/**
Serialize one [`Event`] as a QuakeML document on a single line.

The event is validated first, and nothing is rendered unless the whole document can be built.
*/
pub fn to_quakeml(event: &Event) -> Result<String, QuakeMLError> {
    event.validate()?;
    let document = event_document(event)?;

    let mut writer = Writer::new(Vec::new());
    writer.write_event(XMLEvent::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    document.write_to(&mut writer)?;
    let xml = String::from_utf8_lossy(&writer.into_inner()).replace(['\n', '\t'], "");
    debug!("Rendered QuakeML for event {} ({} bytes)", event.id, xml.len());
    Ok(xml)
}

/// The path a QuakeML document for `event_id` is written to, `<outfolder>/<event_id>.xml`
/// or `<outfolder>/<event_id>_<type>.xml` when a type tag is given
pub fn quakeml_path<P: AsRef<Path>>(event_id: &str, outfolder: P, file_type: Option<&str>) -> PathBuf {
    let name = match file_type {
        Some(file_type) => format!("{event_id}_{file_type}.xml"),
        None => format!("{event_id}.xml"),
    };
    outfolder.as_ref().join(name)
}

/// Write a rendered document to [`quakeml_path`] and return the path written
pub fn write_quakeml<P: AsRef<Path>>(
    xml: &str,
    event_id: &str,
    outfolder: P,
    file_type: Option<&str>,
) -> io::Result<PathBuf> {
    let path = quakeml_path(event_id, outfolder, file_type);
    fs::write(&path, xml)?;
    Ok(path)
}
