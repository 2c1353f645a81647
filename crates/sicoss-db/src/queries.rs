//! # Extraction SQL
//!
//! The four queries against the Mapuche HR schema. Bind parameters:
//! `$1` = year, `$2` = month; the per-legajo variants add `$3` = nro_legaj.
//! Column aliases match the field names of the `FromRow` types in
//! [`crate::extractor`].

/// Employee roster for the period, with aggregated family counts and the
/// retirement-regime flag.
pub const LEGAJOS: &str = r#"
SELECT DISTINCT
    dh01.nro_legaj,
    (dh01.nro_cuil1::char(2) || LPAD(dh01.nro_cuil::char(8), 8, '0') || dh01.nro_cuil2::char(1)) AS cuil,
    dh01.desc_appat || ' ' || dh01.desc_nombr AS apnom,
    COALESCE(dha8.codigosituacion, 1)      AS cod_situacion,
    COALESCE(dha8.codigocondicion, 1)      AS cod_condicion,
    COALESCE(dha8.codigoactividad, 0)      AS cod_actividad,
    COALESCE(dha8.codigozona, 0)           AS cod_zona,
    COALESCE(dha8.codigomodalcontrat, 0)   AS cod_mod_contratacion,
    COALESCE(dha8.trabajador_convencionado, 'S') AS trabajador_convencionado,
    COALESCE(dha8.provincialocalidad, '')  AS provincia_localidad,
    CASE WHEN dh09.codc_bprev = 'REPA' OR dh09.fuerza_reparto THEN '1' ELSE '0' END AS regimen,
    COALESCE(familiares.conyuge, 0) > 0    AS conyuge,
    COALESCE(familiares.hijos, 0)::int4    AS hijos,
    COALESCE(dh09.cant_cargo, 0)::int4     AS adherentes,
    EXISTS (
        SELECT 1 FROM mapuche.dh05 lic
        WHERE lic.nro_legaj = dh01.nro_legaj
          AND mapuche.map_licencia_vigente(lic.nro_licencia, $1::int, $2::int)
    ) AS licencia,
    NOT EXISTS (
        SELECT 1 FROM mapuche.dh21 liq
        INNER JOIN mapuche.dh22 per ON per.nro_liqui = liq.nro_liqui
        WHERE liq.nro_legaj = dh01.nro_legaj
          AND per.per_liano = $1 AND per.per_limes = $2
          AND liq.ano_retro = 0 AND liq.mes_retro = 0
    ) AS retro_sin_actividad
FROM mapuche.dh01
LEFT JOIN (
    SELECT nro_legaj,
           COUNT(*) FILTER (WHERE codc_paren = 'CONY') AS conyuge,
           COUNT(*) FILTER (WHERE codc_paren IN ('HIJO', 'HIJN', 'HINC', 'HINN')) AS hijos
    FROM mapuche.dh02
    WHERE sino_cargo != 'N'
    GROUP BY nro_legaj
) familiares ON familiares.nro_legaj = dh01.nro_legaj
LEFT JOIN mapuche.dha8 ON dha8.nro_legajo = dh01.nro_legaj
LEFT JOIN mapuche.dh09 ON dh09.nro_legaj = dh01.nro_legaj
WHERE EXISTS (
    SELECT 1 FROM mapuche.dh21
    INNER JOIN mapuche.dh22 ON dh22.nro_liqui = dh21.nro_liqui
    WHERE dh21.nro_legaj = dh01.nro_legaj
      AND dh22.per_liano = $1 AND dh22.per_limes = $2
)
ORDER BY dh01.nro_legaj
"#;

pub const LEGAJOS_UNO: &str = r#"
SELECT * FROM (
    SELECT DISTINCT
        dh01.nro_legaj,
        (dh01.nro_cuil1::char(2) || LPAD(dh01.nro_cuil::char(8), 8, '0') || dh01.nro_cuil2::char(1)) AS cuil,
        dh01.desc_appat || ' ' || dh01.desc_nombr AS apnom,
        COALESCE(dha8.codigosituacion, 1)      AS cod_situacion,
        COALESCE(dha8.codigocondicion, 1)      AS cod_condicion,
        COALESCE(dha8.codigoactividad, 0)      AS cod_actividad,
        COALESCE(dha8.codigozona, 0)           AS cod_zona,
        COALESCE(dha8.codigomodalcontrat, 0)   AS cod_mod_contratacion,
        COALESCE(dha8.trabajador_convencionado, 'S') AS trabajador_convencionado,
        COALESCE(dha8.provincialocalidad, '')  AS provincia_localidad,
        CASE WHEN dh09.codc_bprev = 'REPA' OR dh09.fuerza_reparto THEN '1' ELSE '0' END AS regimen,
        COALESCE(familiares.conyuge, 0) > 0    AS conyuge,
        COALESCE(familiares.hijos, 0)::int4    AS hijos,
        COALESCE(dh09.cant_cargo, 0)::int4     AS adherentes,
        EXISTS (
            SELECT 1 FROM mapuche.dh05 lic
            WHERE lic.nro_legaj = dh01.nro_legaj
              AND mapuche.map_licencia_vigente(lic.nro_licencia, $1::int, $2::int)
        ) AS licencia,
        NOT EXISTS (
            SELECT 1 FROM mapuche.dh21 liq
            INNER JOIN mapuche.dh22 per ON per.nro_liqui = liq.nro_liqui
            WHERE liq.nro_legaj = dh01.nro_legaj
              AND per.per_liano = $1 AND per.per_limes = $2
              AND liq.ano_retro = 0 AND liq.mes_retro = 0
        ) AS retro_sin_actividad
    FROM mapuche.dh01
    LEFT JOIN (
        SELECT nro_legaj,
               COUNT(*) FILTER (WHERE codc_paren = 'CONY') AS conyuge,
               COUNT(*) FILTER (WHERE codc_paren IN ('HIJO', 'HIJN', 'HINC', 'HINN')) AS hijos
        FROM mapuche.dh02
        WHERE sino_cargo != 'N'
        GROUP BY nro_legaj
    ) familiares ON familiares.nro_legaj = dh01.nro_legaj
    LEFT JOIN mapuche.dha8 ON dha8.nro_legajo = dh01.nro_legaj
    LEFT JOIN mapuche.dh09 ON dh09.nro_legaj = dh01.nro_legaj
) legajos
WHERE nro_legaj = $3
"#;

/// Liquidated concepts for the period, with the classification-group tag
/// array aggregated per concept code.
pub const CONCEPTOS: &str = r#"
WITH tipos_grupos_conceptos AS (
    SELECT dh16.codn_conce,
           array_agg(DISTINCT dh15.codn_tipogrupo) AS tipos_grupos
    FROM mapuche.dh16
    INNER JOIN mapuche.dh15 ON dh15.codn_grupo = dh16.codn_grupo
    GROUP BY dh16.codn_conce
)
SELECT
    dh21.nro_legaj,
    dh21.codn_conce,
    dh21.impp_conce,
    dh21.tipo_conce,
    COALESCE(dh21.nov1_conce, 0) AS cantidad,
    COALESCE(dh12.nro_orimp, 0)  AS nro_orimp,
    COALESCE(tgc.tipos_grupos, ARRAY[]::integer[]) AS tipos_grupos,
    dh21.codigoescalafon
FROM mapuche.dh21
INNER JOIN mapuche.dh22 ON dh22.nro_liqui = dh21.nro_liqui
LEFT JOIN mapuche.dh12 ON dh12.codn_conce = dh21.codn_conce
LEFT JOIN tipos_grupos_conceptos tgc ON tgc.codn_conce = dh21.codn_conce
WHERE dh22.per_liano = $1
  AND dh22.per_limes = $2
  AND dh22.sino_genimp = true
  AND dh21.codn_conce > 0
"#;

pub const CONCEPTOS_UNO: &str = r#"
WITH tipos_grupos_conceptos AS (
    SELECT dh16.codn_conce,
           array_agg(DISTINCT dh15.codn_tipogrupo) AS tipos_grupos
    FROM mapuche.dh16
    INNER JOIN mapuche.dh15 ON dh15.codn_grupo = dh16.codn_grupo
    GROUP BY dh16.codn_conce
)
SELECT
    dh21.nro_legaj,
    dh21.codn_conce,
    dh21.impp_conce,
    dh21.tipo_conce,
    COALESCE(dh21.nov1_conce, 0) AS cantidad,
    COALESCE(dh12.nro_orimp, 0)  AS nro_orimp,
    COALESCE(tgc.tipos_grupos, ARRAY[]::integer[]) AS tipos_grupos,
    dh21.codigoescalafon
FROM mapuche.dh21
INNER JOIN mapuche.dh22 ON dh22.nro_liqui = dh21.nro_liqui
LEFT JOIN mapuche.dh12 ON dh12.codn_conce = dh21.codn_conce
LEFT JOIN tipos_grupos_conceptos tgc ON tgc.codn_conce = dh21.codn_conce
WHERE dh22.per_liano = $1
  AND dh22.per_limes = $2
  AND dh22.sino_genimp = true
  AND dh21.codn_conce > 0
  AND dh21.nro_legaj = $3
"#;

/// Latest other-employer contribution amounts per employee.
pub const OTRA_ACTIVIDAD: &str = r#"
SELECT DISTINCT ON (nro_legaj)
    nro_legaj,
    COALESCE(importe, 0)     AS importe_jubilatorio,
    COALESCE(importe_sac, 0) AS importe_otros
FROM mapuche.dhe9
ORDER BY nro_legaj, vig_ano DESC, vig_mes DESC
"#;

/// Health-insurance codes per employee.
pub const OBRA_SOCIAL: &str = r#"
SELECT dh01.nro_legaj,
       COALESCE(dh09.codc_obsoc, '000000') AS cod_os
FROM mapuche.dh01
LEFT JOIN mapuche.dh09 ON dh09.nro_legaj = dh01.nro_legaj
"#;
